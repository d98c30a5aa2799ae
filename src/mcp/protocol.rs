//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the core message types relayed between the MCP client
//! and the PromptHouse API. All messages follow the JSON-RPC 2.0
//! specification with MCP-specific extensions.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has `id`)
//! - **Response**: A reply to a request (success or error)
//! - **Notification**: A one-way message (no `id`, no response expected)
//!
//! Incoming messages keep their original JSON so they can be forwarded to the
//! upstream byte-for-byte in meaning; only the fields needed for routing are
//! lifted out.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MessageError;

/// The MCP protocol version used when the client does not name one.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "prompthouse-mcp";

/// The notification sent by clients once initialisation completes.
pub const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";

/// Characters of an unparseable line echoed back in debug data.
const PREVIEW_CHARS: usize = 100;

/// A JSON-RPC 2.0 request ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(serde_json::Number),
    /// String request ID.
    String(String),
    /// Explicit `null`, also used when no ID could be determined.
    Null,
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

/// A JSON-RPC 2.0 request message.
///
/// Requests expect a response.
#[derive(Debug, Clone)]
pub struct JsonRpcRequest {
    /// Request identifier, echoed on the response.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    pub params: Option<Value>,

    /// The message exactly as received.
    pub message: Value,
}

/// A JSON-RPC 2.0 notification message (incoming).
///
/// Notifications never receive a response.
#[derive(Debug, Clone)]
pub struct JsonRpcNotification {
    /// The notification method.
    pub method: String,

    /// The message exactly as received.
    pub message: Value,
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// JSON-RPC 2.0 error codes produced by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received.
    ParseError,
    /// Internal JSON-RPC error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InternalError => -32603,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InternalError => "Internal error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this error corresponds to, `null` if unknown.
    pub id: RequestId,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: RequestId, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error,
        }
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(
            RequestId::Null,
            JsonRpcErrorData::from_code(ErrorCode::ParseError),
        )
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal_error(id: RequestId) -> Self {
        Self::new(id, JsonRpcErrorData::from_code(ErrorCode::InternalError))
    }

    /// Attaches diagnostic data to the error object.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.error = self.error.with_data(data);
        self
    }
}

/// A message written to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    /// A locally produced success response.
    Response(JsonRpcResponse),
    /// A locally produced error response.
    Error(JsonRpcError),
    /// A response relayed from the upstream.
    Relayed(Value),
}

impl From<JsonRpcResponse> for OutgoingMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for OutgoingMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the method name of this message.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }

    /// Returns the request ID if this is a request.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(req) => Some(&req.id),
            Self::Notification(_) => None,
        }
    }
}

/// Parses a line into an incoming message.
///
/// A message is a notification when it has no `id`, or when it is the
/// `notifications/initialized` notification regardless of `id`.
///
/// # Errors
///
/// Returns [`MessageError::Parse`] if the line is not JSON, and
/// [`MessageError::Invalid`] if it is JSON but not a JSON-RPC 2.0 message
/// with a method.
pub fn parse_message(line: &str) -> Result<IncomingMessage, MessageError> {
    let value: Value = serde_json::from_str(line).map_err(|e| MessageError::Parse {
        detail: e.to_string(),
        preview: preview(line),
    })?;

    let Some(obj) = value.as_object() else {
        return Err(invalid(RequestId::Null, None, "message must be a JSON object"));
    };

    let id = match obj.get("id") {
        None => None,
        Some(raw) => Some(
            serde_json::from_value::<RequestId>(raw.clone()).map_err(|_| {
                invalid(
                    RequestId::Null,
                    method_of(obj),
                    "id must be a string, number or null",
                )
            })?,
        ),
    };

    if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(invalid(
            id.unwrap_or(RequestId::Null),
            method_of(obj),
            "jsonrpc field must be \"2.0\"",
        ));
    }

    let Some(method) = method_of(obj) else {
        return Err(invalid(
            id.unwrap_or(RequestId::Null),
            None,
            "method field is required",
        ));
    };

    if method.is_empty() {
        return Err(invalid(
            id.unwrap_or(RequestId::Null),
            None,
            "method field cannot be empty",
        ));
    }

    let params = obj.get("params").cloned();

    match id {
        Some(id) if method != INITIALIZED_NOTIFICATION => {
            Ok(IncomingMessage::Request(JsonRpcRequest {
                id,
                method,
                params,
                message: value,
            }))
        }
        _ => Ok(IncomingMessage::Notification(JsonRpcNotification {
            method,
            message: value,
        })),
    }
}

/// Parses a raw input line into an incoming message.
///
/// Bytes that are not valid UTF-8 are a parse error, like malformed JSON.
///
/// # Errors
///
/// See [`parse_message`].
pub fn parse_bytes(line: &[u8]) -> Result<IncomingMessage, MessageError> {
    match std::str::from_utf8(line) {
        Ok(text) => parse_message(text),
        Err(e) => Err(MessageError::Parse {
            detail: e.to_string(),
            preview: preview(&String::from_utf8_lossy(line)),
        }),
    }
}

fn method_of(obj: &Map<String, Value>) -> Option<String> {
    obj.get("method").and_then(Value::as_str).map(str::to_string)
}

fn invalid(id: RequestId, method: Option<String>, reason: &'static str) -> MessageError {
    MessageError::Invalid { id, method, reason }
}

fn preview(line: &str) -> String {
    line.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::from(1));
        assert_eq!(req.method, "initialize");
        assert_eq!(req.params, Some(serde_json::json!({})));
    }

    #[test]
    fn parse_bytes_rejects_invalid_utf8() {
        let err = parse_bytes(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"\xff\"}").unwrap_err();
        let MessageError::Parse { preview, .. } = err else {
            panic!("Expected Parse, got {err:?}");
        };
        assert!(preview.starts_with("{\"jsonrpc\""));
        assert!(preview.contains('\u{fffd}'));
    }

    #[test]
    fn parse_bytes_accepts_utf8() {
        let msg = parse_bytes(br#"{"jsonrpc":"2.0","id":1,"method":"tools/call"}"#).unwrap();
        assert_eq!(msg.method(), "tools/call");
        assert_eq!(msg.id(), Some(&RequestId::from(1)));
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Notification(notif) = msg else {
            panic!("Expected Notification, got Request");
        };
        assert_eq!(notif.method, "notifications/initialized");
    }

    #[test]
    fn initialized_with_id_is_still_a_notification() {
        let json = r#"{"jsonrpc": "2.0", "id": 9, "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();
        assert!(matches!(msg, IncomingMessage::Notification(_)));
        assert!(msg.id().is_none());
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::String("abc-123".to_string()));
    }

    #[test]
    fn parse_null_id_is_request() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "ping"}"#;
        let msg = parse_message(json).unwrap();
        assert_eq!(msg.id(), Some(&RequestId::Null));
    }

    #[test]
    fn message_is_kept_verbatim() {
        let json = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_prompt","arguments":{"prompt_id":"p1"}}}"#;
        let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
            panic!("Expected Request");
        };
        let original: Value = serde_json::from_str(json).unwrap();
        assert_eq!(req.message, original);
    }

    #[test]
    fn parse_invalid_json() {
        let json = "not valid json";
        let err = parse_message(json).unwrap_err();
        let MessageError::Parse { preview, .. } = err else {
            panic!("Expected Parse error");
        };
        assert_eq!(preview, "not valid json");
    }

    #[test]
    fn parse_preview_is_truncated() {
        let line = format!("{{{}", "x".repeat(500));
        let MessageError::Parse { preview, .. } = parse_message(&line).unwrap_err() else {
            panic!("Expected Parse error");
        };
        assert_eq!(preview.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn parse_missing_jsonrpc() {
        let json = r#"{"id": 1, "method": "test"}"#;
        let err = parse_message(json).unwrap_err();
        assert!(matches!(
            err,
            MessageError::Invalid { id: RequestId::Number(_), .. }
        ));
    }

    #[test]
    fn parse_wrong_jsonrpc_version() {
        let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#;
        let err = parse_message(json).unwrap_err();
        assert!(matches!(err, MessageError::Invalid { .. }));
    }

    #[test]
    fn parse_missing_method_keeps_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "x"}"#;
        let MessageError::Invalid { id, reason, .. } = parse_message(json).unwrap_err() else {
            panic!("Expected Invalid error");
        };
        assert_eq!(id, RequestId::String("x".to_string()));
        assert!(reason.contains("method"));
    }

    #[test]
    fn parse_non_object_is_invalid() {
        let err = parse_message("[1, 2, 3]").unwrap_err();
        assert!(matches!(
            err,
            MessageError::Invalid { id: RequestId::Null, .. }
        ));
    }

    #[test]
    fn parse_object_id_is_invalid() {
        let json = r#"{"jsonrpc": "2.0", "id": {"a": 1}, "method": "ping"}"#;
        assert!(matches!(
            parse_message(json).unwrap_err(),
            MessageError::Invalid { id: RequestId::Null, .. }
        ));
    }

    #[test]
    fn serialise_success_response() {
        let response = JsonRpcResponse::success(RequestId::from(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
    }

    #[test]
    fn serialise_parse_error_has_null_id() {
        let error = JsonRpcError::parse_error();
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}}"#
        );
    }

    #[test]
    fn serialise_internal_error_with_data() {
        let error = JsonRpcError::internal_error(RequestId::String("a".to_string()))
            .with_data(serde_json::json!({"error": "boom"}));
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["id"], "a");
        assert_eq!(value["error"]["code"], -32603);
        assert_eq!(value["error"]["message"], "Internal error");
        assert_eq!(value["error"]["data"]["error"], "boom");
    }

    #[test]
    fn relayed_message_serialises_verbatim() {
        let value = serde_json::json!({"jsonrpc": "2.0", "id": 5, "result": {"ok": true}});
        let msg = OutgoingMessage::Relayed(value.clone());
        assert_eq!(serde_json::to_value(&msg).unwrap(), value);
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::from(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
        assert_eq!(format!("{}", RequestId::Null), "null");
    }
}
