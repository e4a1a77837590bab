// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event bus
//!
//! Every state transition produces exactly one event, emitted *after* the
//! transition is committed to the state store, so subscribers only see
//! durable states. Per-step ordering is strict (the owning executor
//! serializes its transitions); cross-step events interleave freely.

use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use wave_core::Event;

/// An event subscriber.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event);
}

/// NDJSON writer: one JSON object per line on stdout. Diagnostic logging
/// goes to stderr via tracing, so the stream stays machine-readable.
#[derive(Default)]
pub struct NdjsonSink;

impl EventSink for NdjsonSink {
    fn emit(&self, event: &Event) {
        match serde_json::to_string(event) {
            Ok(line) => {
                let stdout = std::io::stdout();
                let mut lock = stdout.lock();
                let _ = writeln!(lock, "{line}");
                let _ = lock.flush();
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize event"),
        }
    }
}

/// Collects events in memory; test subscriber.
#[derive(Clone, Default)]
pub struct CollectSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl EventSink for CollectSink {
    fn emit(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }
}

/// Fan-out of state-transition events to registered sinks, in
/// registration order.
#[derive(Default)]
pub struct EventBus {
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn emit(&self, event: Event) {
        tracing::debug!(
            pipeline = %event.pipeline_id,
            step = event.step_id.as_ref().map(|s| s.as_str()),
            state = ?event.state,
            "transition"
        );
        for sink in &self.sinks {
            sink.emit(&event);
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
