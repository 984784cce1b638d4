//! Entry point: wrap a hooked connection with span-per-operation tracing.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::TracingConfig;
use crate::connection::HookedConnection;
use crate::context::TraceContext;
use crate::error::Error;
use crate::plugin::TracingPlugin;

/// A hooked connection with the tracing hooks installed.
///
/// Hand out per-request handles with [`TracedDb::with_context`]; operations on a
/// handle without an attached context run untraced.
///
/// # Example
///
/// ```rust,ignore
/// use sea_orm_hook_tracing::{wrap_db, HookedConnection, TraceContext};
///
/// let traced = wrap_db(HookedConnection::new(db))?;
///
/// // inside a request handler
/// let db = traced.with_context(Some(TraceContext::current()));
/// let users = Users::find().all(&db).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TracedDb {
    db: HookedConnection,
    plugin: Arc<TracingPlugin>,
}

impl TracedDb {
    /// Install `plugin` into `db`'s registry and wrap it.
    ///
    /// Fails with [`Error::InvalidArgument`] when no handle is given.
    pub fn wrap_with(
        db: impl Into<Option<HookedConnection>>,
        plugin: TracingPlugin,
    ) -> Result<Self, Error> {
        let Some(db) = db.into() else {
            return Err(Error::InvalidArgument("wrap_db requires a database handle"));
        };
        Ok(Self::installed(db, plugin))
    }

    fn installed(mut db: HookedConnection, plugin: TracingPlugin) -> Self {
        let plugin = Arc::new(plugin);
        plugin.install(db.callbacks_mut());
        Self { db, plugin }
    }

    /// A handle carrying `context`, or the wrapped handle itself for `None`.
    pub fn with_context(&self, context: Option<TraceContext>) -> HookedConnection {
        match context {
            Some(context) => self.db.attach(context),
            None => self.db.clone(),
        }
    }

    /// The wrapped handle, without any context attached.
    pub fn db(&self) -> &HookedConnection {
        &self.db
    }

    pub fn plugin(&self) -> &TracingPlugin {
        &self.plugin
    }

    pub fn into_inner(self) -> HookedConnection {
        self.db
    }
}

/// Wrap `db` with the default tracing configuration.
pub fn wrap_db(db: impl Into<Option<HookedConnection>>) -> Result<TracedDb, Error> {
    TracedDb::wrap_with(db, TracingPlugin::default())
}

/// Extension trait for wrapping a plain `DatabaseConnection` in one step.
pub trait TracingExt {
    /// Wrap this connection with tracing hooks using the default configuration.
    fn with_tracing(self) -> TracedDb;

    /// Wrap this connection with tracing hooks using `config`.
    fn with_tracing_config(self, config: TracingConfig) -> TracedDb;
}

impl TracingExt for DatabaseConnection {
    fn with_tracing(self) -> TracedDb {
        self.with_tracing_config(TracingConfig::default())
    }

    fn with_tracing_config(self, config: TracingConfig) -> TracedDb {
        TracedDb::installed(HookedConnection::new(self), TracingPlugin::new(config))
    }
}
