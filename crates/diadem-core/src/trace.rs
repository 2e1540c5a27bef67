//! Structured trace event emission.
//!
//! The solver reports its progress through an in-process sink abstraction:
//! events at well-defined points (bucket start/end, root recording, MEU
//! aggregation, policy emission) carrying structured detail maps. Sinks are
//! a side channel: numeric results never depend on whether one is attached,
//! and the default [`NullSink`] drops everything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Standard trace event names.
pub mod event_names {
    pub const SOLVE_STARTED: &str = "solve_started";
    pub const BUCKETS_PARTITIONED: &str = "buckets_partitioned";
    pub const BUCKET_STARTED: &str = "bucket_started";
    pub const BUCKET_PROCESSED: &str = "bucket_processed";
    pub const MESSAGE_ROUTED: &str = "message_routed";
    pub const ROOT_RECORDED: &str = "root_recorded";
    pub const MEU_COMPUTED: &str = "meu_computed";
    pub const POLICY_EMITTED: &str = "policy_emitted";
    pub const SOLVE_FINISHED: &str = "solve_finished";
}

/// High-level solver phase for a trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    Partition,
    Forward,
    Aggregate,
    Policy,
}

/// Structured trace event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, Value>,
}

impl TraceEvent {
    pub fn new(event: impl Into<String>, phase: Phase) -> Self {
        Self {
            event: event.into(),
            timestamp: Utc::now(),
            phase,
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.insert(key.into(), v);
        }
        self
    }

    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","event":"{}"}}"#,
                self.event
            )
        })
    }
}

/// Trait for receiving trace events.
pub trait TraceSink: Send + Sync {
    fn emit(&self, event: TraceEvent);
}

/// Sink that drops every event; the default.
#[derive(Debug, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn emit(&self, _event: TraceEvent) {}
}

/// Sink that collects events in memory; intended for tests and debugging.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TraceEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events seen so far.
    pub fn snapshot(&self) -> Vec<TraceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl TraceSink for MemorySink {
    fn emit(&self, event: TraceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// JSONL writer sink.
pub struct JsonlSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> TraceSink for JsonlSink<W> {
    fn emit(&self, event: TraceEvent) {
        let line = event.to_jsonl();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}

/// Fan-out sink that forwards events to multiple sinks.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn TraceSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn TraceSink>>) -> Self {
        Self { sinks }
    }
}

impl TraceSink for FanoutSink {
    fn emit(&self, event: TraceEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_event_jsonl() {
        let event = TraceEvent::new(event_names::BUCKET_STARTED, Phase::Forward)
            .with_detail("variable", 3)
            .with_detail("residents", vec![0, 2]);
        let json = event.to_jsonl();
        assert!(json.contains(r#""event":"bucket_started""#));
        assert!(json.contains(r#""phase":"forward""#));
        assert!(json.contains(r#""variable":3"#));
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        sink.emit(TraceEvent::new(event_names::SOLVE_STARTED, Phase::Init));
        sink.emit(TraceEvent::new(event_names::SOLVE_FINISHED, Phase::Policy));
        let events = sink.snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, event_names::SOLVE_STARTED);
    }

    #[test]
    fn test_jsonl_sink_writes_lines() {
        let sink = JsonlSink::new(Vec::new());
        sink.emit(TraceEvent::new(event_names::MEU_COMPUTED, Phase::Aggregate).with_detail("meu", 8.0));
        let buf = sink.writer.into_inner().unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("meu_computed"));
    }

    #[test]
    fn test_fanout_forwards_to_all() {
        let a = Arc::new(MemorySink::new());
        let b = Arc::new(MemorySink::new());
        let fanout = FanoutSink::new(vec![a.clone(), b.clone()]);
        fanout.emit(TraceEvent::new(event_names::ROOT_RECORDED, Phase::Forward));
        assert_eq!(a.snapshot().len(), 1);
        assert_eq!(b.snapshot().len(), 1);
    }
}
