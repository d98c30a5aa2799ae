//! prompthouse-mcp: stdio MCP relay for the PromptHouse prompt library
//!
//! MCP clients (desktop assistants, IDE agents) launch this program as a
//! subprocess and talk JSON-RPC 2.0 over its stdin and stdout. The relay
//! answers the handshake and discovery methods itself and forwards
//! everything else to the PromptHouse API, authenticated by the user's
//! access link.
//!
//! # Architecture
//!
//! - **Local methods**: `initialize`, `tools/list`, `ping` and the empty
//!   listing methods are answered without a network call
//! - **Forwarded methods**: `tools/call` and anything unknown are POSTed
//!   upstream and the response is relayed verbatim
//! - **Concurrency**: each input line is handled on its own task, so
//!   responses are written in completion order
//!
//! # Modules
//!
//! - [`config`]: Configuration loading, precedence and endpoint selection
//! - [`error`]: Error types
//! - [`mcp`]: MCP protocol, routing and the stdio loop
//! - [`upstream`]: HTTP forwarding to the PromptHouse API

pub mod config;
pub mod error;
pub mod mcp;
pub mod upstream;
