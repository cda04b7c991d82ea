//! Error types for the MCP server and client

use crate::protocol::JsonRpcError;
use thiserror::Error;

/// Result type for MCP server operations
pub type Result<T> = std::result::Result<T, McpError>;

/// MCP server errors
///
/// These are JSON-RPC protocol errors: they end up in an `error` envelope.
#[derive(Debug, Error)]
pub enum McpError {
    /// Method not found
    #[error("Method '{0}' not found")]
    MethodNotFound(String),

    /// Invalid parameters
    #[error("{0}")]
    InvalidParams(String),

    /// No tool registered under the requested name
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    /// Session exists but has not completed the handshake
    #[error("Session not ready")]
    SessionNotReady,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Convert to JSON-RPC error
    pub fn to_jsonrpc(&self) -> JsonRpcError {
        match self {
            McpError::MethodNotFound(method) => JsonRpcError::method_not_found(method),
            McpError::InvalidParams(msg) => JsonRpcError::invalid_params(msg.clone()),
            McpError::ToolNotFound(tool) => JsonRpcError::tool_not_found(tool),
            McpError::SessionNotReady => JsonRpcError::session(self.to_string()),
            McpError::Json(e) => JsonRpcError::invalid_params(e.to_string()),
            McpError::Internal(msg) => JsonRpcError::internal_error(msg.clone()),
        }
    }
}

/// Codec and stream errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The SSE body held no data frame besides the sentinel
    #[error("No valid data found in SSE response")]
    NoData,

    /// Payload was not valid JSON or had the wrong shape
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Envelope violated the result/error exclusivity rule
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The server answered with a JSON-RPC error envelope
    #[error("{0}")]
    Rpc(JsonRpcError),
}

/// Session store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Unknown session: {0}")]
    Unknown(String),
}

/// Failure reported by a tool executor.
///
/// Surfaces as a successful `tools/call` envelope with `isError: true`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ToolError(pub String);

impl ToolError {
    pub fn new(msg: impl Into<String>) -> Self {
        ToolError(msg.into())
    }
}

/// MCP client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// No session has been established
    #[error("MCP client not connected. Call connect() first.")]
    NotConnected,

    /// The handshake failed; no partial session is kept
    #[error("Failed to connect to MCP server: {0}")]
    Connection(#[source] Box<ClientError>),

    /// Server answered with a non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Codec failure or JSON-RPC error envelope
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The call timed out; the server may or may not have run it
    #[error("Tool '{0}' outcome unknown: request timed out")]
    OutcomeUnknown(String),

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid endpoint URL
    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// The JSON-RPC error carried by this failure, if any
    pub fn rpc_error(&self) -> Option<&JsonRpcError> {
        match self {
            ClientError::Protocol(ProtocolError::Rpc(e)) => Some(e),
            ClientError::Connection(inner) => inner.rpc_error(),
            _ => None,
        }
    }
}
