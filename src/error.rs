//! Error type returned when building a traced handle.

/// Errors produced by this crate.
///
/// Hooks never fail; the only fallible step is wrapping a handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A required argument was missing.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
