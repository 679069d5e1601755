//! Logging infrastructure: the JSONL call transcript.
//!
//! Provides [`JsonlTranscriptLogger`], a JSONL file writer that implements
//! the [`TranscriptLogger`](pr_review_application::TranscriptLogger) port.

mod jsonl_transcript;

pub use jsonl_transcript::JsonlTranscriptLogger;
