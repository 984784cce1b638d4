//! Hooks that open a span before each operation and close it afterwards.

use std::sync::Arc;

use tracing::{field, Dispatch};

use crate::callbacks::{Callbacks, OperationKind, OperationScope, Stage};
use crate::config::TracingConfig;
use crate::parser::leading_token;

/// Prefix of every hook name this plugin registers.
pub const HOOK_PREFIX: &str = "tracing";

/// Name of the hook registered for `kind` at `stage`, e.g. `tracing:before_query`.
pub fn hook_name(stage: Stage, kind: OperationKind) -> String {
    match stage {
        Stage::Before => format!("{HOOK_PREFIX}:before_{kind}"),
        Stage::After => format!("{HOOK_PREFIX}:after_{kind}"),
    }
}

/// Span-per-operation instrumentation, installable into a [`Callbacks`] registry.
///
/// Spans are created through the ambient `tracing` dispatcher unless one is
/// injected with [`TracingPlugin::with_dispatch`].
///
/// | Field | Description |
/// |-------|-------------|
/// | `otel.name` | `<namespace>:<driver>:<kind>` |
/// | `db.type` | Always `"sql"` |
/// | `db.instance` | Driver name |
/// | `span.kind` | Always `"client/server"` |
/// | `db.statement` | Uppercased statement (when enabled) |
/// | `db.table` | Target table |
/// | `db.method` | Leading token of the statement |
/// | `db.rows_affected` | Rows affected/returned |
/// | `error` | `true` when the operation failed |
#[derive(Debug, Clone, Default)]
pub struct TracingPlugin {
    config: TracingConfig,
    dispatch: Option<Dispatch>,
}

impl TracingPlugin {
    pub fn new(config: TracingConfig) -> Self {
        Self {
            config,
            dispatch: None,
        }
    }

    /// Route spans and events to `dispatch` instead of the ambient default.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    /// Register a before/after hook pair for every operation kind.
    ///
    /// Pairs already present are left alone. Returns how many hooks were added.
    pub fn install(self: &Arc<Self>, callbacks: &mut Callbacks) -> usize {
        let mut added = 0;
        for kind in OperationKind::ALL {
            let plugin = Arc::clone(self);
            if callbacks.register(kind, Stage::Before, hook_name(Stage::Before, kind), move |scope| {
                plugin.before(scope, kind)
            }) {
                added += 1;
            }

            let plugin = Arc::clone(self);
            if callbacks.register(kind, Stage::After, hook_name(Stage::After, kind), move |scope| {
                plugin.after(scope)
            }) {
                added += 1;
            }
        }
        tracing::debug!(added, namespace = %self.config.namespace, "installed tracing hooks");
        added
    }

    /// Operation name for a span, e.g. `sea_orm:postgres:query`.
    pub fn operation_name(&self, driver: &str, kind: OperationKind) -> String {
        format!(
            "{}:{}:{}",
            self.config.namespace,
            driver,
            kind.as_str().to_lowercase()
        )
    }

    /// Start the operation span and attach it to the scope's context.
    pub fn before(&self, scope: &mut OperationScope, kind: OperationKind) {
        let Some(ctx) = scope.context() else {
            tracing::trace!(%kind, "no trace context attached, skipping span");
            return;
        };

        let driver = scope.driver();
        let operation = self.operation_name(driver, kind);
        let parent = ctx.span().id();

        let span = self.in_dispatch(|| {
            tracing::info_span!(
                parent: parent,
                "db.operation",
                otel.name = %operation,
                "db.type" = "sql",
                db.instance = %driver,
                span.kind = "client/server",
                db.statement = field::Empty,
                db.table = field::Empty,
                db.method = field::Empty,
                db.rows_affected = field::Empty,
                db.duration_ms = field::Empty,
                otel.status_code = field::Empty,
                error = field::Empty,
                error.message = field::Empty,
                slow_query = field::Empty,
            )
        });

        let started = ctx.start(span);
        scope.set_context(started);
    }

    /// Tag the active span with the execution results and close it.
    pub fn after(&self, scope: &mut OperationScope) {
        let Some(active) = scope.context_mut().and_then(|ctx| ctx.take_active()) else {
            tracing::trace!(kind = %scope.kind(), "no active span on scope, nothing to close");
            return;
        };
        let span = active.span;
        let elapsed = active.started.elapsed();

        let statement = scope.statement();
        if self.config.log_statements {
            span.record("db.statement", statement.to_uppercase().as_str());
        }
        span.record("db.table", scope.table());
        span.record("db.method", leading_token(statement));
        if self.config.record_row_counts {
            span.record("db.rows_affected", scope.rows_affected());
        }
        span.record("db.duration_ms", elapsed.as_millis() as u64);

        match scope.error() {
            Some(message) => {
                span.record("otel.status_code", "ERROR");
                span.record("error", true);
                span.record("error.message", message);
                self.in_dispatch(|| {
                    tracing::error!(parent: &span, event = "error", "{}", message);
                });
            }
            None => {
                span.record("otel.status_code", "OK");
            }
        }

        if elapsed > self.config.slow_query_threshold {
            span.record("slow_query", true);
            // A failed operation keeps its error as the only event on the span.
            if scope.error().is_none() {
                let duration_ms = elapsed.as_millis() as u64;
                let threshold_ms = self.config.slow_query_threshold.as_millis() as u64;
                self.in_dispatch(|| {
                    tracing::warn!(parent: &span, duration_ms, threshold_ms, "Slow query detected");
                });
            }
        }

        // Last handle: dropping it closes the span.
        drop(span);
    }

    fn in_dispatch<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}
