//! Configuration for the tracing hooks.

use std::time::Duration;

/// Options controlling what the tracing hooks record.
///
/// # Example
///
/// ```rust
/// use sea_orm_hook_tracing::TracingConfig;
/// use std::time::Duration;
///
/// let config = TracingConfig::default()
///     .with_namespace("billing")
///     .with_slow_query_threshold(Duration::from_millis(100));
/// assert_eq!(config.namespace, "billing");
/// ```
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// First segment of every span's operation name (`<namespace>:<driver>:<kind>`).
    /// Default: `"sea_orm"`
    pub namespace: String,

    /// Whether to record the (uppercased) statement in `db.statement`.
    /// Default: `true`
    pub log_statements: bool,

    /// Whether to record `db.rows_affected`.
    /// Default: `true`
    pub record_row_counts: bool,

    /// Operations slower than this get `slow_query = true` and a WARN event.
    /// Default: 500ms
    pub slow_query_threshold: Duration,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            namespace: "sea_orm".to_string(),
            log_statements: true,
            record_row_counts: true,
            slow_query_threshold: Duration::from_millis(500),
        }
    }
}

impl TracingConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace used as the first segment of operation names.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Enable or disable SQL statement recording.
    ///
    /// **Security Warning**: statements rendered without bind parameters may
    /// contain literal values, including PII.
    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Enable or disable row count recording.
    pub fn with_row_count_recording(mut self, enabled: bool) -> Self {
        self.record_row_counts = enabled;
        self
    }

    /// Set the threshold for slow query warnings.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    /// Development preset: statements recorded, aggressive slow query threshold.
    pub fn development() -> Self {
        Self {
            slow_query_threshold: Duration::from_millis(100),
            ..Self::default()
        }
    }

    /// Production preset: no statement text, relaxed slow query threshold.
    pub fn production() -> Self {
        Self {
            log_statements: false,
            slow_query_threshold: Duration::from_secs(1),
            ..Self::default()
        }
    }
}
