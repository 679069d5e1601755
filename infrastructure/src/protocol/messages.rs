//! JSON-RPC protocol types for orchestrator ⇄ provider communication.
//!
//! # Protocol Overview
//!
//! - **Requests**: orchestrator → provider (`initialize`, `tools/call`,
//!   `prompts/get`, `tools/list`, `prompts/list`)
//! - **Responses**: provider → orchestrator (result or error object)
//! - **Notifications**: orchestrator → provider (`notifications/initialized`)
//!
//! Failures of a dispatched call travel as JSON-RPC error objects whose
//! `data` member carries the serialized [`CallError`], so the client can
//! rebuild the exact variant the provider produced.

use pr_review_domain::{CallError, PromptMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision spoken by both peers.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const JSONRPC_VERSION: &str = "2.0";

/// Method names
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const PING: &str = "ping";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const PROMPTS_GET: &str = "prompts/get";
    pub const PROMPTS_LIST: &str = "prompts/list";
}

/// Error codes carried in [`RpcError::code`]
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const TOOL_FAILED: i64 = -32001;
    pub const UNKNOWN_TARGET: i64 = -32002;
    pub const CONTRACT_VIOLATION: i64 = -32003;
    pub const NOT_INITIALIZED: i64 = -32004;
}

/// JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a request with a caller-supplied correlation id.
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC notification (no id, no response)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response
///
/// `id` is `null` only for errors answering a frame whose id could not be
/// recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<u64>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {}", detail))
    }

    pub fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::INVALID_REQUEST, format!("Invalid request: {}", detail))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    pub fn invalid_params(detail: impl std::fmt::Display) -> Self {
        Self::new(codes::INVALID_PARAMS, format!("Invalid params: {}", detail))
    }

    pub fn not_initialized() -> Self {
        Self::new(codes::NOT_INITIALIZED, "Session not initialized")
    }

    /// Encode a dispatch failure with its stable code and full payload.
    pub fn from_call_error(error: &CallError) -> Self {
        let code = match error {
            CallError::UnknownTarget { .. } => codes::UNKNOWN_TARGET,
            CallError::Validation { .. } => codes::INVALID_PARAMS,
            CallError::ContractViolation { .. } => codes::CONTRACT_VIOLATION,
            CallError::ToolFailed { .. } => codes::TOOL_FAILED,
        };
        Self {
            code,
            message: error.to_string(),
            data: serde_json::to_value(error).ok(),
        }
    }

    /// Rebuild the [`CallError`] carried in `data`, if there is one.
    pub fn call_error(&self) -> Option<CallError> {
        self.data
            .as_ref()
            .and_then(|data| serde_json::from_value(data.clone()).ok())
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Name and version of a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

impl Implementation {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// `initialize` request parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    pub client_info: Implementation,
}

/// Declares that a list (tools or prompts) is served
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCapability {
    #[serde(default)]
    pub list_changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListCapability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ListCapability>,
}

/// `initialize` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
}

/// `tools/call` parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Unstructured content block mirroring the structured result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// `tools/call` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Successful result carrying `value` both structured and as JSON text.
    pub fn structured(value: Value) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: value.to_string(),
            }],
            structured_content: Some(value),
            is_error: false,
        }
    }
}

/// `prompts/get` parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// `prompts/get` result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Entry of `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDescriptor>,
}

/// Argument of a listed prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// Entry of `prompts/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPromptsResult {
    pub prompts: Vec<PromptDescriptor>,
}

/// Classification of an incoming JSON-RPC message.
#[derive(Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Has `id` and `method`.
    Request { id: u64 },
    /// Has `id` (possibly `null`) and `result` or `error`, no `method`.
    Response { id: Option<u64> },
    /// Has `method`, no `id`.
    Notification,
    /// Anything else. `id` is kept when it could be recovered.
    Invalid { id: Option<u64> },
}

/// Classify a JSON-RPC message by inspecting `jsonrpc`, `id` and `method`.
pub fn classify_message(json: &Value) -> MessageKind {
    let id = json.get("id").and_then(|v| v.as_u64());
    if json.get("jsonrpc").and_then(|v| v.as_str()) != Some(JSONRPC_VERSION) {
        return MessageKind::Invalid { id };
    }

    let method = json.get("method").and_then(|v| v.as_str());
    let has_id = json.get("id").is_some();
    let is_reply = json.get("result").is_some() || json.get("error").is_some();

    match (method, has_id) {
        (Some(_), true) => match id {
            Some(id) => MessageKind::Request { id },
            None => MessageKind::Invalid { id: None },
        },
        (Some(_), false) => MessageKind::Notification,
        (None, true) if is_reply => MessageKind::Response { id },
        (None, _) => MessageKind::Invalid { id },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_review_domain::{FieldViolation, ToolError};
    use serde_json::json;

    #[test]
    fn classify_request() {
        let json = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {}});
        assert_eq!(classify_message(&json), MessageKind::Request { id: 1 });
    }

    #[test]
    fn classify_response() {
        let json = json!({"jsonrpc": "2.0", "id": 7, "result": {}});
        assert_eq!(classify_message(&json), MessageKind::Response { id: Some(7) });

        let json = json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32700, "message": "x"}});
        assert_eq!(classify_message(&json), MessageKind::Response { id: None });
    }

    #[test]
    fn classify_notification() {
        let json = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert_eq!(classify_message(&json), MessageKind::Notification);
    }

    #[test]
    fn classify_invalid() {
        let json = json!({"id": 3, "method": "tools/call"});
        assert_eq!(classify_message(&json), MessageKind::Invalid { id: Some(3) });

        let json = json!({"jsonrpc": "2.0", "id": "abc", "method": "tools/call"});
        assert_eq!(classify_message(&json), MessageKind::Invalid { id: None });

        let json = json!({"jsonrpc": "2.0", "data": "something"});
        assert_eq!(classify_message(&json), MessageKind::Invalid { id: None });
    }

    #[test]
    fn request_envelope_round_trip() {
        let params = serde_json::to_value(CallToolParams {
            name: "get_pr_data".into(),
            arguments: json!({"owner": "octo", "repo": "hello", "prNumber": 42}),
        })
        .unwrap();
        let request = JsonRpcRequest::new(5, methods::TOOLS_CALL, Some(params));

        let wire = serde_json::to_string(&request).unwrap();
        let parsed: JsonRpcRequest = serde_json::from_str(&wire).unwrap();
        assert_eq!(parsed, request);

        let call: CallToolParams = serde_json::from_value(parsed.params.unwrap()).unwrap();
        assert_eq!(call.name, "get_pr_data");
        assert_eq!(call.arguments["prNumber"], 42);
    }

    #[test]
    fn response_without_error_omits_member() {
        let response = JsonRpcResponse::success(1, json!({"ok": true}));
        let wire = serde_json::to_value(&response).unwrap();
        assert!(wire.get("error").is_none());
        assert_eq!(wire["id"], 1);
    }

    #[test]
    fn failure_with_unknown_id_serializes_null() {
        let response = JsonRpcResponse::failure(None, RpcError::parse_error("bad json"));
        let wire = serde_json::to_value(&response).unwrap();
        assert!(wire["id"].is_null());
        assert_eq!(wire["error"]["code"], codes::PARSE_ERROR);
    }

    #[test]
    fn call_error_survives_the_wire() {
        let errors = [
            CallError::unknown_tool("nope"),
            CallError::Validation {
                name: "get_pr_data".into(),
                violations: vec![FieldViolation::new("prNumber", "is required")],
            },
            CallError::ContractViolation {
                name: "get_pr_data".into(),
                detail: "result does not match output schema".into(),
                violations: vec![FieldViolation::new("filesChanged[1]", "expected string")],
            },
            CallError::ToolFailed {
                name: "post_pr_comment".into(),
                error: ToolError::collaborator_failed("HTTP 500").with_status(500),
            },
        ];
        let expected_codes = [
            codes::UNKNOWN_TARGET,
            codes::INVALID_PARAMS,
            codes::CONTRACT_VIOLATION,
            codes::TOOL_FAILED,
        ];

        for (error, code) in errors.iter().zip(expected_codes) {
            let rpc = RpcError::from_call_error(error);
            assert_eq!(rpc.code, code);

            let wire = serde_json::to_string(&rpc).unwrap();
            let parsed: RpcError = serde_json::from_str(&wire).unwrap();
            assert_eq!(parsed.call_error().as_ref(), Some(error));
        }
    }

    #[test]
    fn plain_rpc_error_has_no_call_error() {
        assert!(RpcError::method_not_found("nope").call_error().is_none());
    }

    #[test]
    fn initialize_wire_shape() {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: json!({}),
            client_info: Implementation::new("pr-review", "0.1.0"),
        };
        let wire = serde_json::to_value(&params).unwrap();
        assert_eq!(wire["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(wire["clientInfo"]["name"], "pr-review");

        let result: InitializeResult = serde_json::from_value(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": "pr-review-provider", "version": "0.1.0"}
        }))
        .unwrap();
        assert!(result.capabilities.tools.is_some());
        assert!(result.capabilities.prompts.is_none());
    }

    #[test]
    fn structured_result_mirrors_text() {
        let result = CallToolResult::structured(json!({"commentId": 1}));
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire["structuredContent"]["commentId"], 1);
        assert_eq!(wire["content"][0]["type"], "text");
        assert_eq!(wire["isError"], false);
    }
}
