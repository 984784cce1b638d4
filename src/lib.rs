//! # sea-orm-hook-tracing
//!
//! Before/after hooks around SeaORM database operations, and a tracing plugin that
//! uses them to open one span per operation.
//!
//! Statements run through a [`HookedConnection`] are classified into five
//! operation kinds (create, update, delete, query, row query). For each kind a
//! registry of named hooks runs before and after the statement executes. The
//! [`TracingPlugin`] registers a pair per kind: the before hook starts a span under
//! the handle's attached [`TraceContext`], the after hook tags it with the statement,
//! table, method, row count and error, then closes it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sea_orm::Database;
//! use sea_orm_hook_tracing::{wrap_db, HookedConnection, TraceContext};
//!
//! let db = Database::connect("postgres://localhost/mydb").await?;
//! let traced = wrap_db(HookedConnection::new(db))?;
//!
//! // per request: nest database spans under the current request span
//! let db = traced.with_context(Some(TraceContext::current()));
//! let users = Users::find().all(&db).await?;
//! ```
//!
//! Operations on a handle without an attached context are not traced.
//!
//! ## Span Fields
//!
//! | Field | Description |
//! |-------|-------------|
//! | `otel.name` | `<namespace>:<driver>:<kind>`, e.g. `sea_orm:postgres:query` |
//! | `db.type` | Always `"sql"` |
//! | `db.instance` | Driver name (`postgres`, `mysql`, `sqlite`, or an override) |
//! | `span.kind` | Always `"client/server"` |
//! | `db.statement` | Uppercased statement (when enabled) |
//! | `db.table` | Target table (when detectable) |
//! | `db.method` | Leading token of the statement |
//! | `db.rows_affected` | Rows affected/returned |
//! | `db.duration_ms` | Time between the before and after hooks |
//! | `otel.status_code` | "OK" or "ERROR" |
//! | `error` / `error.message` | Set on failure, plus one ERROR event on the span |

mod callbacks;
mod config;
mod connection;
mod context;
mod db;
mod error;
mod parser;
mod plugin;

#[cfg(test)]
mod test_support;

pub use callbacks::{Callbacks, Hook, OperationKind, OperationScope, Stage};
pub use config::TracingConfig;
pub use connection::{driver_name, HookedConnection};
pub use context::TraceContext;
pub use db::{wrap_db, TracedDb, TracingExt};
pub use error::Error;
pub use plugin::{hook_name, TracingPlugin, HOOK_PREFIX};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{wrap_db, HookedConnection, TraceContext, TracedDb, TracingConfig, TracingExt};
}
