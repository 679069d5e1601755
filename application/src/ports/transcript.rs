//! Port for structured call transcripts.
//!
//! Defines the [`TranscriptLogger`] trait for recording protocol-level events
//! (calls sent, calls completed, calls failed) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures each call and
//! its outcome in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured transcript event.
///
/// Each event has a type string and a JSON payload containing
/// event-specific fields. The writer adds the timestamp.
pub struct TranscriptEvent {
    /// Event type identifier (e.g., "call_sent", "call_completed", "call_failed").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl TranscriptEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging transcript events.
///
/// `log` is synchronous and infallible: a transcript write failure must never
/// fail a call.
pub trait TranscriptLogger: Send + Sync {
    fn log(&self, event: TranscriptEvent);
}

/// No-op implementation for tests and when transcripts are disabled.
pub struct NoTranscript;

impl TranscriptLogger for NoTranscript {
    fn log(&self, _event: TranscriptEvent) {}
}
