//! JSONL file writer for call transcripts.
//!
//! Each [`TranscriptEvent`] becomes one line: the payload's fields plus
//! `type`, `seq` and an RFC 3339 `timestamp`. The file is opened in append
//! mode so successive runs accumulate in one transcript.

use pr_review_application::ports::transcript::{TranscriptEvent, TranscriptLogger};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

struct Inner {
    writer: BufWriter<File>,
    seq: u64,
}

/// JSONL transcript logger that writes one JSON object per line.
///
/// Thread-safe via `Mutex`. Every line is flushed as it is written.
pub struct JsonlTranscriptLogger {
    inner: Mutex<Inner>,
    path: PathBuf,
}

impl JsonlTranscriptLogger {
    /// Open (or create) the transcript at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                writer: BufWriter::new(file),
                seq: 0,
            }),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: TranscriptEvent, seq: u64) -> Value {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let mut map = match event.payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".into(), other);
                map
            }
        };
        map.insert("type".into(), Value::from(event.event_type));
        map.insert("seq".into(), Value::from(seq));
        map.insert("timestamp".into(), Value::from(timestamp));
        Value::Object(map)
    }
}

impl TranscriptLogger for JsonlTranscriptLogger {
    fn log(&self, event: TranscriptEvent) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.seq += 1;
        let record = Self::record(event, inner.seq);

        let result = serde_json::to_writer(&mut inner.writer, &record)
            .map_err(std::io::Error::from)
            .and_then(|_| inner.writer.write_all(b"\n"))
            .and_then(|_| inner.writer.flush());
        if let Err(e) = result {
            warn!("Transcript write to {} failed: {}", self.path.display(), e);
        }
    }
}
