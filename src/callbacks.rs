//! Named before/after hooks around each kind of database operation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::TraceContext;
use crate::parser::{parse_operation, SqlOperation};

/// The category of database operation a hook is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    Query,
    /// Raw row access, i.e. a streamed result set.
    RowQuery,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Create,
        OperationKind::Update,
        OperationKind::Delete,
        OperationKind::Query,
        OperationKind::RowQuery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Query => "query",
            OperationKind::RowQuery => "row_query",
        }
    }

    /// Map a statement to the kind whose hooks should run for it.
    ///
    /// Returns `None` for statements outside the five kinds (DDL, transaction
    /// control and so on).
    pub fn for_statement(sql: &str) -> Option<Self> {
        match parse_operation(sql) {
            SqlOperation::Select => Some(OperationKind::Query),
            SqlOperation::Insert => Some(OperationKind::Create),
            SqlOperation::Update => Some(OperationKind::Update),
            SqlOperation::Delete => Some(OperationKind::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the execution step a hook runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Before,
    After,
}

/// Per-operation record handed to every hook.
///
/// The statement, row count and error are only filled in once the statement has
/// executed, so before hooks see them empty.
#[derive(Debug)]
pub struct OperationScope {
    kind: OperationKind,
    driver: String,
    context: Option<TraceContext>,
    statement: String,
    table: String,
    rows_affected: u64,
    error: Option<String>,
}

impl OperationScope {
    pub fn new(kind: OperationKind, driver: impl Into<String>) -> Self {
        Self {
            kind,
            driver: driver.into(),
            context: None,
            statement: String::new(),
            table: String::new(),
            rows_affected: 0,
            error: None,
        }
    }

    pub fn with_context(mut self, context: Option<TraceContext>) -> Self {
        self.context = context;
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Name of the backing driver, e.g. `postgres`.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn context(&self) -> Option<&TraceContext> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut TraceContext> {
        self.context.as_mut()
    }

    pub fn set_context(&mut self, context: TraceContext) {
        self.context = Some(context);
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn set_statement(&mut self, statement: impl Into<String>) {
        self.statement = statement.into();
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn set_table(&mut self, table: impl Into<String>) {
        self.table = table.into();
    }

    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    pub fn set_rows_affected(&mut self, rows: u64) {
        self.rows_affected = rows;
    }

    /// Rendered message of the error the operation failed with.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: impl fmt::Display) {
        self.error = Some(error.to_string());
    }
}

/// A hook body.
pub type Hook = Arc<dyn Fn(&mut OperationScope) + Send + Sync>;

#[derive(Clone)]
struct NamedHook {
    name: String,
    hook: Hook,
}

#[derive(Clone, Default)]
struct Processor {
    before: Vec<NamedHook>,
    after: Vec<NamedHook>,
}

impl Processor {
    fn stage(&self, stage: Stage) -> &Vec<NamedHook> {
        match stage {
            Stage::Before => &self.before,
            Stage::After => &self.after,
        }
    }

    fn stage_mut(&mut self, stage: Stage) -> &mut Vec<NamedHook> {
        match stage {
            Stage::Before => &mut self.before,
            Stage::After => &mut self.after,
        }
    }
}

/// Registry of named hooks, keyed by operation kind and stage.
///
/// Hooks nest around the execution step: before hooks run in registration
/// order and after hooks in reverse, so the most recently registered pair is the
/// one closest to the statement on both sides.
#[derive(Clone, Default)]
pub struct Callbacks {
    processors: HashMap<OperationKind, Processor>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` under `name`.
    ///
    /// Returns `false` without touching the registry when the name is already
    /// taken for this kind and stage, which makes repeated installs harmless.
    pub fn register<F>(
        &mut self,
        kind: OperationKind,
        stage: Stage,
        name: impl Into<String>,
        hook: F,
    ) -> bool
    where
        F: Fn(&mut OperationScope) + Send + Sync + 'static,
    {
        let name = name.into();
        let hooks = self.processors.entry(kind).or_default().stage_mut(stage);
        if hooks.iter().any(|existing| existing.name == name) {
            return false;
        }
        hooks.push(NamedHook {
            name,
            hook: Arc::new(hook),
        });
        true
    }

    /// Remove the hook registered under `name`, returning whether one existed.
    pub fn remove(&mut self, kind: OperationKind, stage: Stage, name: &str) -> bool {
        let Some(processor) = self.processors.get_mut(&kind) else {
            return false;
        };
        let hooks = processor.stage_mut(stage);
        let before = hooks.len();
        hooks.retain(|existing| existing.name != name);
        hooks.len() != before
    }

    pub fn contains(&self, kind: OperationKind, stage: Stage, name: &str) -> bool {
        self.names(kind, stage).contains(&name)
    }

    /// Hook names for `kind` and `stage`, in registration order.
    pub fn names(&self, kind: OperationKind, stage: Stage) -> Vec<&str> {
        self.processors
            .get(&kind)
            .map(|processor| {
                processor
                    .stage(stage)
                    .iter()
                    .map(|named| named.name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Run the hooks for the scope's kind at `stage`.
    pub fn run(&self, stage: Stage, scope: &mut OperationScope) {
        let Some(processor) = self.processors.get(&scope.kind()) else {
            return;
        };
        match stage {
            Stage::Before => {
                for named in &processor.before {
                    (named.hook)(scope);
                }
            }
            Stage::After => {
                for named in processor.after.iter().rev() {
                    (named.hook)(scope);
                }
            }
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in OperationKind::ALL {
            if self.processors.contains_key(&kind) {
                map.entry(
                    &kind,
                    &(self.names(kind, Stage::Before), self.names(kind, Stage::After)),
                );
            }
        }
        map.finish()
    }
}
