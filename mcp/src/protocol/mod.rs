//! MCP protocol implementation
//!
//! Core JSON-RPC 2.0 types, MCP payloads, and the SSE framing used on the
//! HTTP transport.

pub mod jsonrpc;
pub mod sse;
pub mod types;

pub use jsonrpc::{
    encode_notification, encode_request, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
};
pub use sse::{data_payloads, frame_as_sse, frame_stream, parse_sse};
pub use types::{
    CallToolParams, CallToolResult, ContentItem, FunctionTool, Implementation, InitializeParams,
    InitializeResult, ListToolsResult, ToolDescriptor,
};

/// Protocol version this implementation speaks by default
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// HTTP header carrying the session id in both directions
pub const SESSION_ID_HEADER: &str = "Mcp-Session-Id";

/// Method names
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}
