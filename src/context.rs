//! Trace context carried from the caller through an operation scope.

use std::time::Instant;

use tracing::Span;

/// The tracing context attached to a handle and copied onto each operation scope.
///
/// `parent` is the span database spans should nest under (usually the request
/// span). The before hook replaces the scope's context with one that also holds the
/// operation span it started; the after hook takes that span back out and closes it.
#[derive(Debug, Clone)]
pub struct TraceContext {
    parent: Span,
    active: Option<ActiveSpan>,
}

#[derive(Debug, Clone)]
pub(crate) struct ActiveSpan {
    pub(crate) span: Span,
    pub(crate) started: Instant,
}

impl TraceContext {
    /// Context whose database spans become children of `parent`.
    pub fn new(parent: Span) -> Self {
        Self {
            parent,
            active: None,
        }
    }

    /// Context parented on whatever span is current on this thread.
    pub fn current() -> Self {
        Self::new(Span::current())
    }

    /// Context with no parent; database spans become trace roots.
    pub fn root() -> Self {
        Self::new(Span::none())
    }

    pub fn parent(&self) -> &Span {
        &self.parent
    }

    /// The operation span started by the before hook, if any.
    pub fn active_span(&self) -> Option<&Span> {
        self.active.as_ref().map(|active| &active.span)
    }

    /// The span new children attach to: the active span, else the parent.
    pub fn span(&self) -> &Span {
        self.active_span().unwrap_or(&self.parent)
    }

    /// Derive a context carrying `span` as its active span.
    pub(crate) fn start(&self, span: Span) -> Self {
        Self {
            parent: self.span().clone(),
            active: Some(ActiveSpan {
                span,
                started: Instant::now(),
            }),
        }
    }

    pub(crate) fn take_active(&mut self) -> Option<ActiveSpan> {
        self.active.take()
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::root()
    }
}

impl From<Span> for TraceContext {
    fn from(parent: Span) -> Self {
        Self::new(parent)
    }
}

// `Span`'s own `PartialEq` treats two disabled spans as different, so compare ids.
impl PartialEq for TraceContext {
    fn eq(&self, other: &Self) -> bool {
        self.parent.id() == other.parent.id()
            && self.active_span().and_then(Span::id) == other.active_span().and_then(Span::id)
            && self.active.is_some() == other.active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Capture;

    #[test]
    fn root_contexts_compare_equal() {
        assert_eq!(TraceContext::root(), TraceContext::default());
        assert!(TraceContext::root().active_span().is_none());
    }

    #[test]
    fn start_nests_under_the_current_span() {
        let capture = Capture::default();
        tracing::dispatcher::with_default(&capture.dispatch(), || {
            let request = tracing::info_span!("request");
            let ctx = TraceContext::new(request.clone());
            assert_eq!(ctx.span().id(), request.id());

            let op = tracing::info_span!("op");
            let mut started = ctx.start(op.clone());
            assert_eq!(started.parent().id(), request.id());
            assert_eq!(started.span().id(), op.id());
            assert_ne!(started, ctx);

            let active = started.take_active().map(|active| active.span);
            assert_eq!(active.and_then(|span| span.id()), op.id());
            assert!(started.take_active().is_none());
        });
    }
}
