//! SeaORM connection that runs registered hooks around every statement.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, ExecResult, QueryResult, Statement,
    StreamTrait,
};
use tracing::{Instrument, Span};

use crate::callbacks::{Callbacks, OperationKind, OperationScope, Stage};
use crate::context::TraceContext;
use crate::parser::{extract_table, parse_operation};

/// A SeaORM `DatabaseConnection` with a hook pipeline and an optional trace context.
///
/// This wrapper implements `ConnectionTrait` and `StreamTrait`, so entities and
/// queries can run against it unchanged. Each statement gets an [`OperationScope`];
/// the before hooks for its [`OperationKind`] run, the statement executes, the
/// scope is filled with the outcome, and the after hooks run.
///
/// Clones share the hook registry. Mutate it through [`HookedConnection::callbacks_mut`]
/// before handing clones out; a mutation after that only affects the mutated copy.
///
/// # Example
///
/// ```rust,ignore
/// use sea_orm::Database;
/// use sea_orm_hook_tracing::{HookedConnection, OperationKind, Stage};
///
/// let db = Database::connect("postgres://localhost/mydb").await?;
/// let mut hooked = HookedConnection::new(db);
/// hooked.callbacks_mut().register(OperationKind::Delete, Stage::Before, "audit:delete", |scope| {
///     tracing::info!(table = scope.table(), "deleting");
/// });
/// ```
#[derive(Debug, Clone)]
pub struct HookedConnection {
    inner: DatabaseConnection,
    callbacks: Arc<Callbacks>,
    context: Option<TraceContext>,
    driver: Arc<str>,
}

impl HookedConnection {
    /// Wrap a connection with an empty hook registry.
    pub fn new(connection: DatabaseConnection) -> Self {
        Self::with_callbacks(connection, Callbacks::new())
    }

    /// Wrap a connection with a prepared hook registry.
    pub fn with_callbacks(connection: DatabaseConnection, callbacks: Callbacks) -> Self {
        let driver = driver_name(connection.get_database_backend());
        Self {
            inner: connection,
            callbacks: Arc::new(callbacks),
            context: None,
            driver: Arc::from(driver),
        }
    }

    /// Override the driver name reported to hooks.
    pub fn with_driver_name(mut self, name: impl AsRef<str>) -> Self {
        self.driver = Arc::from(name.as_ref());
        self
    }

    pub fn driver_name(&self) -> &str {
        &self.driver
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// Mutable access to the registry, copying it first if it is shared.
    pub fn callbacks_mut(&mut self) -> &mut Callbacks {
        Arc::make_mut(&mut self.callbacks)
    }

    /// The trace context attached to this handle, if any.
    pub fn context(&self) -> Option<&TraceContext> {
        self.context.as_ref()
    }

    /// A handle sharing this connection and registry with `context` attached.
    pub fn attach(&self, context: TraceContext) -> Self {
        Self {
            context: Some(context),
            ..self.clone()
        }
    }

    /// Get a reference to the underlying `DatabaseConnection`.
    pub fn inner(&self) -> &DatabaseConnection {
        &self.inner
    }

    /// Consume the wrapper and return the inner `DatabaseConnection`.
    pub fn into_inner(self) -> DatabaseConnection {
        self.inner
    }

    fn scope(&self, kind: OperationKind, sql: &str) -> OperationScope {
        OperationScope::new(kind, &*self.driver)
            .with_context(self.context.clone())
            .with_table(extract_table(sql).unwrap_or_default())
    }

    /// Run `operation` between the before and after hooks for `kind`.
    async fn run<T, F, R>(
        &self,
        kind: OperationKind,
        sql: &str,
        operation: F,
        rows: R,
    ) -> Result<T, DbErr>
    where
        F: Future<Output = Result<T, DbErr>>,
        R: FnOnce(&T) -> u64,
    {
        let in_flight = InFlight::start(&self.callbacks, self.scope(kind, sql), sql);
        let result = operation.instrument(in_flight.span()).await;
        in_flight.finish(result.as_ref().map(rows));
        result
    }
}

/// Driver name for a backend, as reported in `db.instance`.
pub fn driver_name(backend: DbBackend) -> &'static str {
    match backend {
        DbBackend::Postgres => "postgres",
        DbBackend::MySql => "mysql",
        DbBackend::Sqlite => "sqlite",
    }
}

/// An operation whose before hooks have run.
///
/// If it is dropped without [`InFlight::finish`], e.g. because the caller's future
/// was cancelled, the after hooks still run with the statement and a cancellation
/// error.
struct InFlight<'a> {
    callbacks: &'a Callbacks,
    statement: &'a str,
    scope: Option<OperationScope>,
}

impl<'a> InFlight<'a> {
    fn start(callbacks: &'a Callbacks, mut scope: OperationScope, statement: &'a str) -> Self {
        callbacks.run(Stage::Before, &mut scope);
        Self {
            callbacks,
            statement,
            scope: Some(scope),
        }
    }

    /// Span the statement should execute under.
    fn span(&self) -> Span {
        self.scope
            .as_ref()
            .and_then(OperationScope::context)
            .and_then(TraceContext::active_span)
            .cloned()
            .unwrap_or_else(Span::none)
    }

    fn finish(mut self, outcome: Result<u64, &DbErr>) {
        if let Some(mut scope) = self.scope.take() {
            scope.set_statement(self.statement);
            match outcome {
                Ok(rows) => scope.set_rows_affected(rows),
                Err(err) => scope.set_error(err),
            }
            self.callbacks.run(Stage::After, &mut scope);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(mut scope) = self.scope.take() {
            scope.set_statement(self.statement);
            scope.set_error("operation cancelled");
            self.callbacks.run(Stage::After, &mut scope);
        }
    }
}

impl From<DatabaseConnection> for HookedConnection {
    fn from(connection: DatabaseConnection) -> Self {
        Self::new(connection)
    }
}

impl AsRef<DatabaseConnection> for HookedConnection {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.inner
    }
}

#[async_trait]
impl ConnectionTrait for HookedConnection {
    fn get_database_backend(&self) -> DbBackend {
        self.inner.get_database_backend()
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        let Some(kind) = OperationKind::for_statement(&stmt.sql) else {
            tracing::trace!(operation = %parse_operation(&stmt.sql), "statement bypasses hooks");
            return self.inner.execute(stmt).await;
        };
        let sql = stmt.sql.clone();
        self.run(kind, &sql, self.inner.execute(stmt), |result: &ExecResult| {
            result.rows_affected()
        })
        .await
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        let Some(kind) = OperationKind::for_statement(sql) else {
            tracing::trace!(operation = %parse_operation(sql), "statement bypasses hooks");
            return self.inner.execute_unprepared(sql).await;
        };
        self.run(kind, sql, self.inner.execute_unprepared(sql), |result: &ExecResult| {
            result.rows_affected()
        })
        .await
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        let kind = OperationKind::for_statement(&stmt.sql).unwrap_or(OperationKind::Query);
        let sql = stmt.sql.clone();
        self.run(kind, &sql, self.inner.query_one(stmt), |row: &Option<QueryResult>| {
            u64::from(row.is_some())
        })
        .await
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        let kind = OperationKind::for_statement(&stmt.sql).unwrap_or(OperationKind::Query);
        let sql = stmt.sql.clone();
        self.run(kind, &sql, self.inner.query_all(stmt), |rows: &Vec<QueryResult>| {
            rows.len() as u64
        })
        .await
    }

    fn support_returning(&self) -> bool {
        self.inner.support_returning()
    }

    fn is_mock_connection(&self) -> bool {
        self.inner.is_mock_connection()
    }
}

impl StreamTrait for HookedConnection {
    type Stream<'a> = <DatabaseConnection as StreamTrait>::Stream<'a>;

    fn stream<'a>(
        &'a self,
        stmt: Statement,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Stream<'a>, DbErr>> + 'a + Send>> {
        Box::pin(async move {
            let sql = stmt.sql.clone();
            // Row count is unknown until the stream is drained.
            self.run(OperationKind::RowQuery, &sql, self.inner.stream(stmt), |_| 0)
                .await
        })
    }
}
