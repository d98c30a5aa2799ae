//! Methods answered by the relay itself.
//!
//! These produce static results synchronously and never fail. They are
//! authoritative: a method listed in [`LocalMethod`] is never forwarded to
//! the upstream.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::mcp::protocol::{JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME};

/// A method the relay answers locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalMethod {
    /// `initialize`
    Initialize,
    /// `tools/list`
    ToolsList,
    /// `ping`
    Ping,
    /// `roots/list`
    RootsList,
    /// `resources/list`
    ResourcesList,
    /// `prompts/list`
    PromptsList,
    /// `completion/complete`
    Completion,
}

impl LocalMethod {
    /// Looks up a method name.
    #[must_use]
    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "initialize" => Some(Self::Initialize),
            "tools/list" => Some(Self::ToolsList),
            "ping" => Some(Self::Ping),
            "roots/list" => Some(Self::RootsList),
            "resources/list" => Some(Self::ResourcesList),
            "prompts/list" => Some(Self::PromptsList),
            "completion/complete" => Some(Self::Completion),
            _ => None,
        }
    }

    /// Produces the success response for this method.
    #[must_use]
    pub fn respond(self, params: Option<&Value>, id: RequestId) -> JsonRpcResponse {
        let result = match self {
            Self::Initialize => initialize(params),
            Self::ToolsList => json!({ "tools": tool_definitions() }),
            Self::Ping => json!({}),
            Self::RootsList => json!({
                "roots": [{ "uri": "file:///prompts", "name": "Prompts" }]
            }),
            Self::ResourcesList => json!({ "resources": [] }),
            Self::PromptsList => json!({ "prompts": [] }),
            Self::Completion => json!({
                "completion": { "values": [], "total": 0, "hasMore": false }
            }),
        };

        JsonRpcResponse::success(id, result)
    }
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ListChanged,
    /// Logging capability (no options).
    pub logging: Value,
    /// Prompt capability (no options).
    pub prompts: Value,
    /// Resource capability (no options).
    pub resources: Value,
    /// Roots capability, only when the client supports roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<ListChanged>,
}

impl ServerCapabilities {
    /// Capabilities offered to a client; `roots` only if the client has it.
    #[must_use]
    pub fn for_client(client_has_roots: bool) -> Self {
        Self {
            tools: ListChanged::default(),
            logging: json!({}),
            prompts: json!({}),
            resources: json!({}),
            roots: client_has_roots.then(ListChanged::default),
        }
    }
}

/// A `{ "listChanged": true }` capability entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChanged {
    /// Whether the list can change during the session.
    pub list_changed: bool,
}

impl Default for ListChanged {
    fn default() -> Self {
        Self { list_changed: true }
    }
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// The parts of the initialize request the relay looks at.
///
/// Every field is optional; malformed params fall back to the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    #[serde(default)]
    protocol_version: Option<Value>,
    #[serde(default)]
    capabilities: Option<Value>,
}

impl InitializeParams {
    fn protocol_version(&self) -> &str {
        self.protocol_version
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or(MCP_PROTOCOL_VERSION)
    }

    fn client_has_roots(&self) -> bool {
        self.capabilities
            .as_ref()
            .and_then(|caps| caps.get("roots"))
            .is_some_and(is_truthy)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn initialize(params: Option<&Value>) -> Value {
    let params: InitializeParams = params
        .and_then(|p| serde_json::from_value(p.clone()).ok())
        .unwrap_or_default();

    json!({
        "protocolVersion": params.protocol_version(),
        "capabilities": ServerCapabilities::for_client(params.client_has_roots()),
        "serverInfo": ServerInfo::default(),
    })
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Returns the tools served through the PromptHouse API.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_prompt_list",
            description: "List all available prompts with their titles, descriptions, and tags. \
                          Use this to discover what prompts are available before retrieving \
                          specific ones.",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "get_prompt",
            description: "Retrieve the complete content of a specific prompt by its ID, \
                          including all messages, arguments, and metadata.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "prompt_id": {
                        "type": "string",
                        "description": "The unique identifier of the prompt to retrieve"
                    }
                },
                "required": ["prompt_id"]
            }),
        },
    ]
}
