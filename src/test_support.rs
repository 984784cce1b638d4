//! In-memory span capture for unit tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    I64(i64),
    U64(u64),
    Bool(bool),
}

#[derive(Debug, Clone, Default)]
pub struct Fields(pub HashMap<String, FieldValue>);

impl Fields {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(FieldValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0
            .insert(field.name().to_string(), FieldValue::Str(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), FieldValue::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), FieldValue::U64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), FieldValue::Bool(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().to_string(), FieldValue::Str(format!("{value:?}")));
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: tracing::Level,
    pub fields: Fields,
}

impl LogEntry {
    pub fn message(&self) -> Option<&str> {
        self.fields.str("message")
    }
}

#[derive(Debug, Clone)]
pub struct CapturedSpan {
    pub name: &'static str,
    pub parent: Option<&'static str>,
    pub fields: Fields,
    pub logs: Vec<LogEntry>,
    pub closed: usize,
}

#[derive(Default)]
struct State {
    open: HashMap<u64, CapturedSpan>,
    finished: Vec<CapturedSpan>,
}

/// Records every span and event seen by its dispatcher.
///
/// All clones share one dispatcher, so span ids stay valid across them.
#[derive(Clone)]
pub struct Capture {
    state: Arc<Mutex<State>>,
    dispatch: Dispatch,
}

struct CaptureLayer {
    state: Arc<Mutex<State>>,
}

impl Default for Capture {
    fn default() -> Self {
        let state = Arc::new(Mutex::new(State::default()));
        let layer = CaptureLayer {
            state: state.clone(),
        };
        Self {
            state,
            dispatch: Dispatch::new(tracing_subscriber::registry().with(layer)),
        }
    }
}

impl Capture {
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch.clone()
    }

    /// Spans that have been closed, in closing order.
    pub fn finished(&self) -> Vec<CapturedSpan> {
        self.state.lock().unwrap().finished.clone()
    }

    /// Closed spans with the given metadata name.
    pub fn finished_named(&self, name: &str) -> Vec<CapturedSpan> {
        self.finished()
            .into_iter()
            .filter(|span| span.name == name)
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().open.len()
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        attrs.record(&mut fields);
        let parent = ctx
            .span(id)
            .and_then(|span| span.parent())
            .map(|parent| parent.name());
        self.state.lock().unwrap().open.insert(
            id.into_u64(),
            CapturedSpan {
                name: attrs.metadata().name(),
                parent,
                fields,
                logs: Vec::new(),
                closed: 0,
            },
        );
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        if let Some(span) = self.state.lock().unwrap().open.get_mut(&id.into_u64()) {
            values.record(&mut span.fields);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.event_span(event) else {
            return;
        };
        let mut fields = Fields::default();
        event.record(&mut fields);
        if let Some(captured) = self.state.lock().unwrap().open.get_mut(&span.id().into_u64()) {
            captured.logs.push(LogEntry {
                level: *event.metadata().level(),
                fields,
            });
        }
    }

    fn on_close(&self, id: Id, _ctx: Context<'_, S>) {
        let mut state = self.state.lock().unwrap();
        if let Some(mut span) = state.open.remove(&id.into_u64()) {
            span.closed += 1;
            state.finished.push(span);
        }
    }
}
