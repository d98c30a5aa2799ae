//! Model Context Protocol (MCP) relay.
//!
//! The relay speaks MCP to a local client over stdio and forwards the work
//! it cannot answer itself to the PromptHouse HTTP API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Relay                           │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │   │  Transport  │───▶│   Server    │───▶│  Dispatch   │     │
//! │   │   (stdio)   │◀───│ (task pool) │◀───│  (routing)  │     │
//! │   └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                            │        │        │
//! │                                            ▼        ▼        │
//! │                                    ┌──────────┐ ┌─────────┐  │
//! │                                    │ Handlers │ │Upstream │  │
//! │                                    │ (local)  │ │ (HTTPS) │  │
//! │                                    └──────────┘ └─────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05, and echoes a
//! client-requested version during initialisation.

pub mod dispatch;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod transport;

pub use dispatch::Dispatcher;
pub use protocol::{
    IncomingMessage, JsonRpcError, JsonRpcRequest, JsonRpcResponse, OutgoingMessage,
    MCP_PROTOCOL_VERSION,
};
pub use server::McpServer;
pub use transport::{LineTransport, StdioTransport};
