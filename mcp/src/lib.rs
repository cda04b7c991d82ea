//! # Toolrelay MCP
//!
//! Model Context Protocol (MCP) server and client over HTTP. Requests are
//! JSON-RPC 2.0 objects POSTed to one endpoint; replies come back as a
//! Server-Sent Events stream with a single data frame.
//!
//! ## Architecture
//!
//! - **Protocol Layer**: JSON-RPC 2.0 envelopes, MCP payloads and SSE framing
//! - **Session Layer**: per-client handshake state keyed by `Mcp-Session-Id`
//! - **Server Layer**: dispatcher, tool registry and the axum transport
//! - **Handler Layer**: built-in tools (`calculator`, `web_search`)
//! - **Client**: handshake, tool listing and tool calls
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use toolrelay_mcp::handlers::builtin_registry;
//! use toolrelay_mcp::{McpClient, McpServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Arc::new(McpServer::new(
//!         ServerConfig::default(),
//!         builtin_registry(true, None)?,
//!     ));
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8006").await?;
//!     tokio::spawn(toolrelay_mcp::server::serve(listener, server, "/mcp", async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }));
//!
//!     let client = McpClient::new(Default::default())?;
//!     client.connect("http://127.0.0.1:8006/mcp").await?;
//!     let text = client
//!         .call_tool(
//!             "calculator",
//!             serde_json::json!({"num1": 4, "num2": 5, "operation": "add"}),
//!         )
//!         .await?;
//!     assert_eq!(text, "Result: 9.0");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod session;

// Re-export main types
pub use client::{ClientOptions, McpClient};
pub use error::{ClientError, McpError, ProtocolError, Result, ToolError};
pub use protocol::{CallToolResult, JsonRpcRequest, JsonRpcResponse, ToolDescriptor};
pub use server::{McpServer, ServerConfig, Tool, ToolRegistry};
pub use session::{Session, SessionStore};
