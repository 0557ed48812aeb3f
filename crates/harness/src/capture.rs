use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use daybook_storage::SqliteStore;

/// One log record, with the number of stored documents at the moment it was
/// emitted when the layer watches a store.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
    pub documents: Option<u64>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A `tracing` layer that records events in memory.
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    watched: Option<Mutex<SqliteStore>>,
}

/// Read side of a `CaptureLayer`.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    pub fn new() -> (Self, CapturedLogs) {
        let logs = CapturedLogs::default();
        let layer = Self {
            events: Arc::clone(&logs.events),
            watched: None,
        };
        (layer, logs)
    }

    /// Count the documents in `store` each time an event is recorded.
    pub fn watching(mut self, store: SqliteStore) -> Self {
        self.watched = Some(Mutex::new(store));
        self
    }
}

impl CapturedLogs {
    pub fn events(&self) -> Vec<CapturedEvent> {
        lock(&self.events).clone()
    }

    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        lock(&self.events)
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct FieldVisitor<'a>(&'a mut CapturedEvent);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0.message = value.to_string();
        } else {
            self.0.fields.push((field.name().to_string(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0.message = format!("{value:?}");
        } else {
            self.0
                .fields
                .push((field.name().to_string(), format!("{value:?}")));
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut captured = CapturedEvent {
            level: *event.metadata().level(),
            message: String::new(),
            fields: Vec::new(),
            documents: None,
        };
        event.record(&mut FieldVisitor(&mut captured));
        captured.documents = self
            .watched
            .as_ref()
            .and_then(|store| lock(store).document_count().ok());
        lock(&self.events).push(captured);
    }
}
