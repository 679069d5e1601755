//! Framed byte transport between the two peers.
//!
//! Every message is one frame:
//!
//! ```text
//! Content-Length: <n>\r\n
//! \r\n
//! <n bytes of UTF-8 JSON>
//! ```
//!
//! Header lines other than `Content-Length` are ignored. EOF between frames is
//! a clean close; EOF inside a frame, a missing length or an unparsable
//! length are errors.
//!
//! A [`Transport`] bundles the two halves (and, for the production setup, the
//! provider child process) so a [`ClientSession`](super::client::ClientSession)
//! can take ownership of all of it at once.

use crate::protocol::error::{ProtocolError, Result};
use serde::Serialize;
use std::process::Stdio;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
};
use tokio::process::{Child, Command};
use tracing::{debug, info, trace};

/// Largest body accepted by [`FrameReader`].
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const CONTENT_LENGTH: &str = "content-length";

/// Reads `Content-Length` framed messages.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    line: String,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line: String::new(),
        }
    }

    /// Read the next frame body.
    ///
    /// Returns `Ok(None)` when the peer closed the stream between frames.
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let mut content_length: Option<usize> = None;
        let mut saw_header = false;

        loop {
            self.line.clear();
            let bytes_read = self.reader.read_line(&mut self.line).await?;
            if bytes_read == 0 {
                if saw_header {
                    return Err(ProtocolError::Truncated {
                        expected: content_length.unwrap_or(0),
                    });
                }
                return Ok(None);
            }

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                if saw_header {
                    break;
                }
                // Stray separator before any header
                continue;
            }
            saw_header = true;

            if let Some((name, value)) = trimmed.split_once(':')
                && name.trim().eq_ignore_ascii_case(CONTENT_LENGTH)
            {
                let len = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| ProtocolError::InvalidContentLength(value.trim().to_string()))?;
                content_length = Some(len);
            } else {
                trace!("Ignoring header line: {}", trimmed);
            }
        }

        let len = content_length.ok_or(ProtocolError::MissingContentLength)?;
        if len > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge(len));
        }

        let mut body = vec![0u8; len];
        match self.reader.read_exact(&mut body).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(ProtocolError::Truncated { expected: len });
            }
            Err(e) => return Err(e.into()),
        }

        debug!("Received frame ({} bytes)", len);
        trace!("Received: {}", String::from_utf8_lossy(&body));
        Ok(Some(body))
    }
}

/// Writes `Content-Length` framed messages.
///
/// Not synchronized on its own; shared writers sit behind a `Mutex` so frames
/// from concurrent senders never interleave.
pub struct FrameWriter<W> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Write one frame and flush it.
    pub async fn write_frame(&mut self, body: &[u8]) -> Result<()> {
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(body).await?;
        self.writer.flush().await?;
        debug!("Sent frame ({} bytes)", body.len());
        Ok(())
    }

    /// Serialize `message` as JSON and write it as one frame.
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let json = serde_json::to_vec(message)?;
        trace!("Sending: {}", String::from_utf8_lossy(&json));
        self.write_frame(&json).await
    }

    /// Flush and shut down the underlying stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Both halves of a duplex channel, plus the child process behind them.
pub struct Transport {
    pub(crate) reader: BoxedReader,
    pub(crate) writer: BoxedWriter,
    pub(crate) child: Option<Child>,
}

impl Transport {
    /// Wrap arbitrary halves (e.g. the two ends of `tokio::io::duplex`).
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            child: None,
        }
    }

    /// Split a single bidirectional stream.
    pub fn from_stream(stream: impl AsyncRead + AsyncWrite + Send + 'static) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer)
    }

    /// Spawn the provider command and talk to it over its stdin/stdout.
    pub fn spawn(command: &ProviderCommand) -> Result<Self> {
        let mut child = command.spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| ProtocolError::Spawn {
            command: command.program.clone(),
            source: std::io::Error::other("Failed to capture stdin"),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ProtocolError::Spawn {
            command: command.program.clone(),
            source: std::io::Error::other("Failed to capture stdout"),
        })?;

        Ok(Self {
            reader: Box::new(stdout),
            writer: Box::new(stdin),
            child: Some(child),
        })
    }
}

/// How to launch the provider child process.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Variables set explicitly on the child
    pub env: Vec<(String, String)>,
}

impl std::fmt::Debug for ProviderCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values may hold the bearer token
        let env_names: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ProviderCommand")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env_names)
            .finish()
    }
}

impl ProviderCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn spawn(&self) -> Result<Child> {
        debug!("Spawning provider: {} {:?}", self.program, self.args);

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        // This catches cases where Drop doesn't run (SIGKILL, OOM kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let child = cmd.spawn().map_err(|source| ProtocolError::Spawn {
            command: self.program.clone(),
            source,
        })?;
        info!("Provider started (pid {:?})", child.id());
        Ok(child)
    }
}
