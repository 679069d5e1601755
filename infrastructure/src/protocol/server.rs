//! Provider-side serve loop.
//!
//! Reads frames from the orchestrator, answers `initialize` inline, and
//! dispatches every other request on its own task so a slow handler never
//! holds up the rest. All responses share one `Mutex`ed [`FrameWriter`].
//!
//! Until `initialize` has been answered, any other request gets a
//! `-32004 not initialized` error.

use crate::protocol::error::Result;
use crate::protocol::messages::{
    CallToolParams, CallToolResult, GetPromptParams, GetPromptResult, Implementation,
    InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListCapability,
    ListPromptsResult, ListToolsResult, MessageKind, PROTOCOL_VERSION, RpcError,
    ServerCapabilities, classify_message, codes, methods,
};
use crate::protocol::transport::{FrameReader, FrameWriter};
use crate::provider::ToolProvider;
use pr_review_domain::{CallError, ToolError};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

/// Serves one orchestrator connection.
pub struct ProviderServer {
    provider: Arc<ToolProvider>,
    info: Implementation,
}

impl ProviderServer {
    pub fn new(provider: Arc<ToolProvider>) -> Self {
        Self {
            provider,
            info: Implementation::new("pr-review-provider", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_info(mut self, info: Implementation) -> Self {
        self.info = info;
        self
    }

    /// Serve until the peer closes the stream.
    ///
    /// In-flight requests are allowed to finish before returning. A framing
    /// error ends the loop and is returned.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut reader = FrameReader::new(reader);
        let writer = Arc::new(Mutex::new(FrameWriter::new(writer)));
        let initialized = AtomicBool::new(false);
        let mut in_flight = JoinSet::new();

        let outcome = loop {
            let body = match reader.read_frame().await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    info!("Orchestrator closed the transport");
                    break Ok(());
                }
                Err(e) => {
                    warn!("Serve loop: {}", e);
                    break Err(e);
                }
            };

            // Reap finished tasks so the set does not grow unbounded
            while in_flight.try_join_next().is_some() {}

            let message: Value = match serde_json::from_slice(&body) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Serve loop: unparsable frame: {}", e);
                    let error = RpcError::parse_error(e);
                    Self::respond(&writer, JsonRpcResponse::failure(None, error)).await;
                    continue;
                }
            };

            match classify_message(&message) {
                MessageKind::Request { id } => {
                    let request: JsonRpcRequest = match serde_json::from_value(message) {
                        Ok(r) => r,
                        Err(e) => {
                            Self::respond(
                                &writer,
                                JsonRpcResponse::failure(Some(id), RpcError::invalid_request(e)),
                            )
                            .await;
                            continue;
                        }
                    };

                    if request.method == methods::INITIALIZE {
                        let response = match self.initialize(request.params) {
                            Ok(result) => {
                                initialized.store(true, Ordering::SeqCst);
                                JsonRpcResponse::success(id, result)
                            }
                            Err(e) => JsonRpcResponse::failure(Some(id), e),
                        };
                        Self::respond(&writer, response).await;
                        continue;
                    }

                    if !initialized.load(Ordering::SeqCst) {
                        debug!("Rejecting '{}' before initialize", request.method);
                        Self::respond(
                            &writer,
                            JsonRpcResponse::failure(Some(id), RpcError::not_initialized()),
                        )
                        .await;
                        continue;
                    }

                    let provider = Arc::clone(&self.provider);
                    let writer = Arc::clone(&writer);
                    in_flight.spawn(async move {
                        let response =
                            match Self::handle(provider, &request.method, request.params).await {
                                Ok(result) => JsonRpcResponse::success(id, result),
                                Err(e) => JsonRpcResponse::failure(Some(id), e),
                            };
                        Self::respond(&writer, response).await;
                    });
                }
                MessageKind::Notification => {
                    let method = message
                        .get("method")
                        .and_then(|m| m.as_str())
                        .unwrap_or_default();
                    if method == methods::INITIALIZED {
                        debug!("Orchestrator confirmed initialization");
                    } else {
                        trace!("Ignoring notification '{}'", method);
                    }
                }
                MessageKind::Response { id } => {
                    warn!("Serve loop: unexpected response id={:?}", id);
                }
                MessageKind::Invalid { id } => {
                    warn!("Serve loop: invalid message {}", message);
                    let error = RpcError::invalid_request("not a JSON-RPC 2.0 request");
                    Self::respond(&writer, JsonRpcResponse::failure(id, error)).await;
                }
            }
        };

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!("Request task failed: {}", e);
            }
        }
        outcome
    }

    fn initialize(&self, params: Option<Value>) -> std::result::Result<Value, RpcError> {
        let params: InitializeParams = decode_params(params)?;
        info!(
            "Initialize from {} {} (protocol {})",
            params.client_info.name, params.client_info.version, params.protocol_version
        );
        if params.protocol_version != PROTOCOL_VERSION {
            // Answer with ours; the client decides whether it can proceed
            warn!(
                "Client requested protocol {}, offering {}",
                params.protocol_version, PROTOCOL_VERSION
            );
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ListCapability::default()),
                prompts: Some(ListCapability::default()),
            },
            server_info: self.info.clone(),
        };
        to_result(&result)
    }

    async fn handle(
        provider: Arc<ToolProvider>,
        method: &str,
        params: Option<Value>,
    ) -> std::result::Result<Value, RpcError> {
        match method {
            methods::TOOLS_CALL => {
                let params: CallToolParams = decode_params(params)?;
                let name = params.name.clone();
                debug!("tools/call '{}'", name);
                // A panicking handler must still produce a response
                let content = tokio::spawn(async move {
                    provider.dispatch(&params.name, params.arguments).await
                })
                .await
                .unwrap_or_else(|e| {
                    warn!("tool '{}' aborted: {}", name, e);
                    Err(CallError::ToolFailed {
                        name: name.clone(),
                        error: ToolError::execution_failed(format!("handler aborted: {}", e)),
                    })
                })
                .map_err(|e| {
                    debug!("tools/call '{}' failed: {}", name, e);
                    RpcError::from_call_error(&e)
                })?;
                to_result(&CallToolResult::structured(content))
            }
            methods::PROMPTS_GET => {
                let params: GetPromptParams = decode_params(params)?;
                let name = params.name.clone();
                debug!("prompts/get '{}'", name);
                let messages = tokio::spawn(async move {
                    provider.render_prompt(&params.name, params.arguments)
                })
                .await
                .unwrap_or_else(|e| {
                    warn!("prompt '{}' aborted: {}", name, e);
                    Err(CallError::ContractViolation {
                        name: name.clone(),
                        detail: format!("renderer aborted: {}", e),
                        violations: Vec::new(),
                    })
                })
                .map_err(|e| RpcError::from_call_error(&e))?;
                to_result(&GetPromptResult {
                    description: None,
                    messages,
                })
            }
            methods::TOOLS_LIST => to_result(&ListToolsResult {
                tools: provider.list_tools(),
            }),
            methods::PROMPTS_LIST => to_result(&ListPromptsResult {
                prompts: provider.list_prompts(),
            }),
            methods::PING => Ok(json!({})),
            other => Err(RpcError::method_not_found(other)),
        }
    }

    async fn respond<W: AsyncWrite + Unpin>(
        writer: &Mutex<FrameWriter<W>>,
        response: JsonRpcResponse,
    ) {
        if let Err(e) = writer.lock().await.write_message(&response).await {
            warn!("Failed to write response id={:?}: {}", response.id, e);
        }
    }
}

fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> std::result::Result<T, RpcError> {
    serde_json::from_value(params.unwrap_or_else(|| json!({}))).map_err(RpcError::invalid_params)
}

fn to_result<T: serde::Serialize>(value: &T) -> std::result::Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::new(codes::TOOL_FAILED, e.to_string()))
}
