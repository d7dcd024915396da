//! Log capture for assertions on `tracing` output.
//!
//! # Example
//!
//! ```
//! use pageflow_testing::logs::capture;
//!
//! let ((), logs) = capture(|| tracing::warn!(requested = "reports", "No match"));
//!
//! assert!(logs.contains(tracing::Level::WARN, "No match"));
//! assert_eq!(logs.events()[0].field("requested"), Some("reports"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Event level
    pub level: Level,
    /// Module path or explicit target
    pub target: String,
    /// The formatted message
    pub message: String,
    /// Remaining fields, formatted
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    /// A field value by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// A `tracing-subscriber` layer that records every event it sees.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// Create an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events recorded at `level`.
    #[must_use]
    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .collect()
    }

    /// Whether an event at `level` has a message containing `needle`.
    #[must_use]
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.at_level(level)
            .iter()
            .any(|event| event.message.contains(needle))
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let captured = CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(captured);
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{value:?}"));
        }
    }
}

/// Run `f` with a capturing subscriber installed on this thread.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, CapturedLogs) {
    let logs = CapturedLogs::new();
    let subscriber = tracing_subscriber::registry().with(logs.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_records_fields() {
        let ((), logs) = capture(|| {
            tracing::debug!(configurer = "csrf", "Applying configurer");
            tracing::warn!(requested = %"reports", count = 2, "No menu entry matches");
        });

        assert_eq!(logs.events().len(), 2);
        let warning = &logs.at_level(Level::WARN)[0];
        assert_eq!(warning.message, "No menu entry matches");
        assert_eq!(warning.field("requested"), Some("reports"));
        assert_eq!(warning.field("count"), Some("2"));
    }

    #[test]
    fn test_capture_is_scoped() {
        let ((), logs) = capture(|| ());
        tracing::warn!("outside");

        assert!(logs.events().is_empty());
    }
}
