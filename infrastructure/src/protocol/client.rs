//! Client session - the orchestrator's end of the protocol.
//!
//! A [`ClientSession`] owns one [`Transport`] for its whole life:
//!
//! - a single background reader task owns the read half and resolves pending
//!   calls by correlation id (responses may arrive in any order)
//! - writes go through one `Mutex`ed [`FrameWriter`], so concurrent callers
//!   never interleave frames
//! - each call parks a `oneshot` sender in the pending table and waits at most
//!   `call_timeout` for it
//!
//! ```text
//! call_tool ─┐                              ┌─▶ oneshot(id=1) ─▶ caller A
//! call_tool ─┼─▶ writer ─▶ provider ─▶ reader ┤
//! call_prompt┘                              └─▶ oneshot(id=2) ─▶ caller B
//! ```
//!
//! Closing the session (explicitly, or because the peer hung up) empties the
//! pending table; every awaiting caller then observes [`SessionError::Closed`].

use crate::protocol::messages::{
    CallToolParams, CallToolResult, ContentBlock, GetPromptParams, GetPromptResult,
    Implementation, InitializeParams, InitializeResult, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, ListPromptsResult, ListToolsResult, MessageKind, PROTOCOL_VERSION,
    PromptDescriptor, RpcError, ServerCapabilities, ToolDescriptor, classify_message, codes,
    methods,
};
use crate::protocol::transport::{BoxedReader, BoxedWriter, FrameReader, FrameWriter, Transport};
use async_trait::async_trait;
use pr_review_application::config::SessionParams;
use pr_review_application::ports::tool_session::{SessionError, ToolSession};
use pr_review_application::ports::transcript::{NoTranscript, TranscriptEvent, TranscriptLogger};
use pr_review_domain::{CallError, PromptMessage, ToolError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::process::Child;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

type PendingTable = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;
type SharedWriter = Arc<Mutex<FrameWriter<BoxedWriter>>>;

/// Removes a pending entry if the awaiting call is dropped before it resolves.
struct PendingGuard {
    id: u64,
    pending: PendingTable,
    armed: bool,
}

impl PendingGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let id = self.id;
        if let Ok(mut pending) = self.pending.try_lock() {
            pending.remove(&id);
        } else if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let pending = Arc::clone(&self.pending);
            handle.spawn(async move {
                pending.lock().await.remove(&id);
            });
        }
    }
}

/// An open, handshaken session with a tool provider.
pub struct ClientSession {
    writer: SharedWriter,
    pending: PendingTable,
    next_id: AtomicU64,
    /// Cancelled on close or when the reader task ends.
    closed: CancellationToken,
    reader_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    /// Provider child process (killed on close, and by `kill_on_drop`).
    child: Mutex<Option<Child>>,
    params: SessionParams,
    server_info: Implementation,
    capabilities: ServerCapabilities,
    transcript: Arc<dyn TranscriptLogger>,
}

impl ClientSession {
    /// Identity this client reports in `initialize`.
    pub fn client_info() -> Implementation {
        Implementation::new("pr-review", env!("CARGO_PKG_VERSION"))
    }

    /// Open a session over `transport` and complete the handshake.
    pub async fn connect(transport: Transport, params: SessionParams) -> Result<Self, SessionError> {
        Self::connect_with_transcript(transport, params, Arc::new(NoTranscript)).await
    }

    /// Open a session, recording every call to `transcript`.
    pub async fn connect_with_transcript(
        transport: Transport,
        params: SessionParams,
        transcript: Arc<dyn TranscriptLogger>,
    ) -> Result<Self, SessionError> {
        let Transport {
            reader,
            writer,
            child,
        } = transport;

        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        let writer: SharedWriter = Arc::new(Mutex::new(FrameWriter::new(writer)));
        let closed = CancellationToken::new();

        let reader_handle = tokio::spawn(Self::reader_loop(
            FrameReader::new(reader),
            Arc::clone(&pending),
            Arc::clone(&writer),
            closed.clone(),
        ));

        let mut session = Self {
            writer,
            pending,
            next_id: AtomicU64::new(1),
            closed,
            reader_handle: std::sync::Mutex::new(Some(reader_handle)),
            child: Mutex::new(child),
            params,
            server_info: Implementation::new("unknown", "unknown"),
            capabilities: ServerCapabilities::default(),
            transcript,
        };

        match session.handshake().await {
            Ok(result) => {
                info!(
                    "Connected to {} {} (protocol {})",
                    result.server_info.name, result.server_info.version, result.protocol_version
                );
                session.server_info = result.server_info;
                session.capabilities = result.capabilities;
                Ok(session)
            }
            Err(e) => {
                warn!("Handshake failed: {}", e);
                session.close().await;
                Err(e)
            }
        }
    }

    async fn handshake(&self) -> Result<InitializeResult, SessionError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Self::client_info(),
        };

        let response = self
            .request(
                methods::INITIALIZE,
                &params,
                self.params.handshake_timeout,
            )
            .await
            .map_err(|e| match e {
                SessionError::Timeout { timeout, .. } => SessionError::Handshake(format!(
                    "no initialize response within {:?}",
                    timeout
                )),
                SessionError::Closed => {
                    SessionError::Handshake("transport closed during handshake".into())
                }
                other => SessionError::Handshake(other.to_string()),
            })?;

        let result: InitializeResult = Self::decode_result(response)
            .map_err(|e| SessionError::Handshake(e.to_string()))?;

        if result.protocol_version != PROTOCOL_VERSION {
            return Err(SessionError::Handshake(format!(
                "protocol version mismatch: expected {}, got {}",
                PROTOCOL_VERSION, result.protocol_version
            )));
        }

        self.notify(methods::INITIALIZED, None).await?;
        Ok(result)
    }

    /// Background reader loop - single owner of the read half.
    ///
    /// Runs until the peer closes the stream, a framing error occurs, or the
    /// session is closed. On exit it cancels `closed` and empties the pending
    /// table so every waiting caller wakes up with `Closed`.
    async fn reader_loop(
        mut reader: FrameReader<BoxedReader>,
        pending: PendingTable,
        writer: SharedWriter,
        closed: CancellationToken,
    ) {
        loop {
            let frame = tokio::select! {
                _ = closed.cancelled() => break,
                frame = reader.read_frame() => frame,
            };

            let body = match frame {
                Ok(Some(body)) => body,
                Ok(None) => {
                    info!("Provider closed the transport");
                    break;
                }
                Err(e) => {
                    warn!("Reader loop: {}", e);
                    break;
                }
            };

            let message: Value = match serde_json::from_slice(&body) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Reader loop: discarding unparsable frame: {}", e);
                    continue;
                }
            };

            match classify_message(&message) {
                MessageKind::Response { id: Some(id) } => {
                    let response: JsonRpcResponse = match serde_json::from_value(message) {
                        Ok(r) => r,
                        Err(e) => {
                            warn!("Reader loop: malformed response id={}: {}", id, e);
                            continue;
                        }
                    };
                    let sender = pending.lock().await.remove(&id);
                    match sender {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => warn!("Reader loop: no pending call for response id={}", id),
                    }
                }
                MessageKind::Response { id: None } => {
                    warn!("Reader loop: provider reported an uncorrelated error: {}", message);
                }
                MessageKind::Request { id } => {
                    let method = message
                        .get("method")
                        .and_then(|m| m.as_str())
                        .unwrap_or_default();
                    debug!("Reader loop: rejecting provider request '{}'", method);
                    let response =
                        JsonRpcResponse::failure(Some(id), RpcError::method_not_found(method));
                    if let Err(e) = writer.lock().await.write_message(&response).await {
                        warn!("Reader loop: failed to reject provider request: {}", e);
                    }
                }
                MessageKind::Notification => {
                    trace!("Reader loop: ignoring notification {}", message);
                }
                MessageKind::Invalid { .. } => {
                    warn!("Reader loop: discarding invalid message {}", message);
                }
            }
        }

        closed.cancel();
        let mut pending = pending.lock().await;
        if !pending.is_empty() {
            debug!("Reader loop: failing {} pending call(s)", pending.len());
        }
        pending.clear();
    }

    /// Send a request and wait for its correlated response.
    async fn request<P: Serialize>(
        &self,
        method: &str,
        params: &P,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, SessionError> {
        let params = serde_json::to_value(params)
            .map_err(|e| SessionError::Protocol(format!("unserializable params: {}", e)))?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, Some(params));

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if self.closed.is_cancelled() {
                return Err(SessionError::Closed);
            }
            pending.insert(id, tx);
        }
        let guard = PendingGuard {
            id,
            pending: Arc::clone(&self.pending),
            armed: true,
        };

        if let Err(e) = self.writer.lock().await.write_message(&request).await {
            return Err(if self.closed.is_cancelled() {
                SessionError::Closed
            } else {
                SessionError::Transport(e.to_string())
            });
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => {
                guard.disarm();
                Ok(response)
            }
            Ok(Err(_)) => {
                guard.disarm();
                Err(SessionError::Closed)
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                guard.disarm();
                debug!("Request id={} ({}) timed out", id, method);
                Err(SessionError::Timeout {
                    name: method.to_string(),
                    timeout,
                })
            }
        }
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), SessionError> {
        let notification = JsonRpcNotification::new(method, params);
        self.writer
            .lock()
            .await
            .write_message(&notification)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    /// Unwrap a response: rebuild the remote `CallError` or decode the result.
    fn decode_result<T: DeserializeOwned>(response: JsonRpcResponse) -> Result<T, SessionError> {
        if let Some(error) = response.error {
            return Err(match error.call_error() {
                Some(call_error) => SessionError::Call(call_error),
                None if error.code == codes::NOT_INITIALIZED => {
                    SessionError::Protocol("provider reports session not initialized".into())
                }
                None => SessionError::Protocol(error.to_string()),
            });
        }
        let result = response
            .result
            .ok_or_else(|| SessionError::Protocol("response has neither result nor error".into()))?;
        serde_json::from_value(result)
            .map_err(|e| SessionError::Protocol(format!("unexpected result shape: {}", e)))
    }

    /// Run one call, recording it in the transcript.
    async fn traced_call<P: Serialize, T: DeserializeOwned>(
        &self,
        kind: &'static str,
        method: &str,
        name: &str,
        params: &P,
    ) -> Result<T, SessionError> {
        let started = Instant::now();
        self.transcript.log(TranscriptEvent::new(
            "call_sent",
            json!({ "kind": kind, "name": name }),
        ));

        let result = match self.request(method, params, self.params.call_timeout).await {
            Ok(response) => Self::decode_result(response),
            Err(SessionError::Timeout { timeout, .. }) => Err(SessionError::Timeout {
                name: name.to_string(),
                timeout,
            }),
            Err(e) => Err(e),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                debug!("{} '{}' completed in {}ms", kind, name, elapsed_ms);
                self.transcript.log(TranscriptEvent::new(
                    "call_completed",
                    json!({ "kind": kind, "name": name, "duration_ms": elapsed_ms }),
                ));
            }
            Err(e) => {
                debug!("{} '{}' failed after {}ms: {}", kind, name, elapsed_ms, e);
                self.transcript.log(TranscriptEvent::new(
                    "call_failed",
                    json!({
                        "kind": kind,
                        "name": name,
                        "duration_ms": elapsed_ms,
                        "error": e.to_string(),
                    }),
                ));
            }
        }
        result
    }

    /// Invoke a tool; returns its structured content.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, SessionError> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let result: CallToolResult = self
            .traced_call("tool", methods::TOOLS_CALL, name, &params)
            .await?;

        if result.is_error {
            let message = result
                .content
                .iter()
                .map(|ContentBlock::Text { text }| text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            return Err(SessionError::Call(CallError::ToolFailed {
                name: name.to_string(),
                error: ToolError::execution_failed(message),
            }));
        }

        result.structured_content.ok_or_else(|| {
            SessionError::Protocol(format!("tool '{}' returned no structured content", name))
        })
    }

    /// Render a prompt; returns its messages in order.
    pub async fn call_prompt(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<Vec<PromptMessage>, SessionError> {
        let params = GetPromptParams {
            name: name.to_string(),
            arguments,
        };
        let result: GetPromptResult = self
            .traced_call("prompt", methods::PROMPTS_GET, name, &params)
            .await?;
        Ok(result.messages)
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, SessionError> {
        let response = self
            .request(methods::TOOLS_LIST, &json!({}), self.params.call_timeout)
            .await?;
        let result: ListToolsResult = Self::decode_result(response)?;
        Ok(result.tools)
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>, SessionError> {
        let response = self
            .request(methods::PROMPTS_LIST, &json!({}), self.params.call_timeout)
            .await?;
        let result: ListPromptsResult = Self::decode_result(response)?;
        Ok(result.prompts)
    }

    /// Number of calls currently awaiting a response.
    pub async fn pending_calls(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Tear the session down. Idempotent.
    pub async fn close(&self) {
        if !self.closed.is_cancelled() {
            debug!("Closing session");
        }
        self.closed.cancel();

        let handle = self
            .reader_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        // The reader normally clears it; this covers a reader that already died
        self.pending.lock().await.clear();

        if let Err(e) = self.writer.lock().await.shutdown().await {
            trace!("Writer shutdown: {}", e);
        }

        let child = self.child.lock().await.take();
        if let Some(mut child) = child {
            debug!("Killing provider process");
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.closed.cancel();
        // `kill_on_drop` takes care of the child process
    }
}

#[async_trait]
impl ToolSession for ClientSession {
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, SessionError> {
        ClientSession::call_tool(self, name, arguments).await
    }

    async fn call_prompt(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<Vec<PromptMessage>, SessionError> {
        ClientSession::call_prompt(self, name, arguments).await
    }

    async fn close(&self) {
        ClientSession::close(self).await
    }
}
