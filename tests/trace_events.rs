//! Trace events, only built with `--features tracing`.

#![cfg(feature = "tracing")]

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use vmarena::Arena;

#[derive(Debug, Default)]
struct Recorded {
    message: String,
    fields: Vec<&'static str>,
}

impl Visit for Recorded {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(field.name());
        }
    }
}

/// Keeps every event seen while installed.
#[derive(Clone, Default)]
struct Collector(Arc<Mutex<Vec<Recorded>>>);

impl<S: Subscriber> Layer<S> for Collector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        assert_eq!(*event.metadata().level(), Level::TRACE);
        let mut recorded = Recorded::default();
        event.record(&mut recorded);
        self.0.lock().unwrap().push(recorded);
    }
}

#[test]
fn backend_calls_emit_trace_events() {
    let collector = Collector::default();
    let _guard = tracing_subscriber::registry()
        .with(collector.clone())
        .set_default();

    let mut arena = Arena::new();
    arena.reserve(1 << 20).unwrap();
    let page = arena.page_size();
    arena.grow_commit(page).unwrap();
    arena.reset();
    arena.decommit(page).unwrap();
    arena.release().unwrap();

    let events = collector.0.lock().unwrap();
    let seen: Vec<(&str, &[&str])> = events
        .iter()
        .map(|e| (e.message.as_str(), e.fields.as_slice()))
        .collect();
    assert_eq!(
        seen,
        [
            ("reserve", &["base", "size"][..]),
            ("commit", &["base", "committed", "additional"][..]),
            ("decommit", &["base", "committed", "size"][..]),
            ("release", &["base", "size"][..]),
        ]
    );
}
