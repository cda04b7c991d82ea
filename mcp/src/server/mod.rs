//! MCP server implementation
//!
//! Core dispatcher that routes JSON-RPC requests to handlers based on the
//! method name and the readiness of the caller's session.

pub mod http;
pub mod tools;

use crate::error::{McpError, Result};
use crate::protocol::jsonrpc::JSONRPC_VERSION;
use crate::protocol::{
    methods, Implementation, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, RequestId, PROTOCOL_VERSION,
};
use crate::session::SessionStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use http::{router, serve};
pub use tools::{Tool, ToolRegistry};

/// MCP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server name
    pub name: String,

    /// Server version
    pub version: String,

    /// Version answered when the client proposes an unsupported one
    pub protocol_version: String,

    /// Versions echoed back when a client proposes them
    pub supported_versions: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "toolrelay".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            supported_versions: vec![PROTOCOL_VERSION.to_string()],
        }
    }
}

impl ServerConfig {
    /// Pick the protocol version for a session. Never fails.
    pub fn negotiate(&self, requested: Option<&str>) -> String {
        match requested {
            Some(v) if self.supported_versions.iter().any(|s| s == v) => v.to_string(),
            _ => self.protocol_version.clone(),
        }
    }
}

/// Transport precondition failures: answered with a bare HTTP error status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// `Accept` does not list both JSON and SSE
    NotAcceptable,
    /// Request other than `initialize` without a session header
    MissingSession,
    /// Session header names no known session
    UnknownSession,
    /// Body is not JSON
    Parse(String),
    /// Body is JSON but not a request object
    Invalid(String),
    /// Body is a JSON array
    Batch,
}

/// What the transport should send back for one request
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A JSON-RPC envelope to frame as SSE, with the session header to echo
    Reply {
        response: JsonRpcResponse,
        session_id: Option<String>,
    },
    /// Notification acknowledged; empty body
    Accepted { session_id: String },
    /// Precondition failure
    Rejected(Rejection),
}

/// MCP server
pub struct McpServer {
    config: ServerConfig,
    sessions: Arc<SessionStore>,
    tools: Arc<ToolRegistry>,
}

impl McpServer {
    /// Create a new MCP server with its own session store
    pub fn new(config: ServerConfig, tools: ToolRegistry) -> Self {
        Self::with_sessions(config, tools, Arc::new(SessionStore::new()))
    }

    /// Create a server around an existing session store
    pub fn with_sessions(
        config: ServerConfig,
        tools: ToolRegistry,
        sessions: Arc<SessionStore>,
    ) -> Self {
        info!(
            server = %config.name,
            version = %config.version,
            tools = tools.len(),
            "MCP server initialized"
        );

        Self {
            config,
            sessions,
            tools: Arc::new(tools),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Handle one decoded request carrying an optional session header.
    pub async fn handle(&self, session_id: Option<&str>, request: JsonRpcRequest) -> Dispatch {
        debug!(
            method = %request.method,
            id = ?request.id,
            session_id = ?session_id,
            "Dispatching request"
        );

        if request.method == methods::INITIALIZE {
            if request.jsonrpc != JSONRPC_VERSION {
                return Dispatch::Reply {
                    response: invalid_version(request.id),
                    session_id: None,
                };
            }
            return self.handle_initialize(request);
        }

        let Some(session_id) = session_id else {
            warn!(method = %request.method, "Request without session id");
            return Dispatch::Rejected(Rejection::MissingSession);
        };
        let Some(session) = self.sessions.get(session_id) else {
            warn!(session_id, "Request for unknown session");
            return Dispatch::Rejected(Rejection::UnknownSession);
        };

        if request.jsonrpc != JSONRPC_VERSION {
            warn!(version = %request.jsonrpc, "Invalid JSON-RPC version");
            if request.is_notification() {
                return Dispatch::Accepted {
                    session_id: session.id,
                };
            }
            return Dispatch::Reply {
                response: invalid_version(request.id),
                session_id: Some(session.id),
            };
        }

        if request.method == methods::INITIALIZED {
            if self.sessions.mark_ready(&session.id).is_err() {
                return Dispatch::Rejected(Rejection::UnknownSession);
            }
            return Dispatch::Accepted {
                session_id: session.id,
            };
        }

        if request.is_notification() {
            debug!(method = %request.method, "Ignoring notification");
            return Dispatch::Accepted {
                session_id: session.id,
            };
        }

        let id = request.id.clone();
        let result = if session.ready {
            self.route(request).await
        } else {
            Err(McpError::SessionNotReady)
        };

        let response = match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                warn!(error = %e, "Request failed");
                JsonRpcResponse::error(id, e.to_jsonrpc())
            }
        };

        Dispatch::Reply {
            response,
            session_id: Some(session.id),
        }
    }

    async fn route(&self, request: JsonRpcRequest) -> Result<Value> {
        match request.method.as_str() {
            methods::TOOLS_LIST => self.handle_tools_list(),
            methods::TOOLS_CALL => self.handle_tool_call(request.params).await,
            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    /// Handle initialize request: always opens a fresh session
    fn handle_initialize(&self, request: JsonRpcRequest) -> Dispatch {
        let requested = request
            .params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);
        let protocol_version = self.config.negotiate(requested);
        let session = self.sessions.create();

        info!(
            session_id = %session.id,
            requested = ?requested,
            protocol_version = %protocol_version,
            client = ?request.params.as_ref().and_then(|p| p.get("clientInfo")),
            "Received initialize request"
        );

        let result = InitializeResult {
            protocol_version,
            capabilities: json!({ "tools": {} }),
            server_info: Implementation {
                name: self.config.name.clone(),
                version: self.config.version.clone(),
            },
        };

        let response = match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(e) => JsonRpcResponse::error(request.id, McpError::from(e).to_jsonrpc()),
        };

        Dispatch::Reply {
            response,
            session_id: Some(session.id),
        }
    }

    /// Handle tools/list request
    fn handle_tools_list(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.tools.list(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Handle tools/call request
    async fn handle_tool_call(&self, params: Option<Value>) -> Result<Value> {
        let params =
            params.ok_or_else(|| McpError::InvalidParams("Missing parameters".to_string()))?;

        let tool_name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                McpError::InvalidParams("Missing required parameter: name".to_string())
            })?;

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let result = self.tools.call(tool_name, &arguments).await?;
        Ok(serde_json::to_value(result)?)
    }
}

fn invalid_version(id: Option<RequestId>) -> JsonRpcResponse {
    JsonRpcResponse::error(id, JsonRpcError::invalid_request("Invalid JSON-RPC version"))
}

#[cfg(test)]
mod tests {
    use super::tools::tests::EchoTool;
    use super::*;
    use crate::protocol::jsonrpc::{INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND};
    use crate::protocol::CallToolResult;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn server() -> McpServer {
        let tools = ToolRegistry::new().with(Arc::new(EchoTool)).unwrap();
        McpServer::new(ServerConfig::default(), tools)
    }

    fn request(id: &str, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest::new(RequestId::from(id), method, params)
    }

    fn reply(dispatch: Dispatch) -> (JsonRpcResponse, Option<String>) {
        match dispatch {
            Dispatch::Reply {
                response,
                session_id,
            } => (response, session_id),
            other => panic!("expected reply, got {:?}", other),
        }
    }

    async fn initialize(server: &McpServer) -> String {
        let init = request(
            "1",
            methods::INITIALIZE,
            Some(json!({"protocolVersion": PROTOCOL_VERSION})),
        );
        let (_, session_id) = reply(server.handle(None, init).await);
        session_id.unwrap()
    }

    async fn ready_session(server: &McpServer) -> String {
        let session_id = initialize(server).await;
        let notification = JsonRpcRequest::notification(methods::INITIALIZED, None);
        server.handle(Some(session_id.as_str()), notification).await;
        session_id
    }

    #[tokio::test]
    async fn test_initialize_creates_one_unready_session() {
        let server = server();
        let init = request(
            "1",
            methods::INITIALIZE,
            Some(json!({"protocolVersion": PROTOCOL_VERSION})),
        );
        let (response, session_id) = reply(server.handle(None, init).await);

        let session_id = session_id.unwrap();
        assert_eq!(server.sessions().len(), 1);
        assert!(!server.sessions().get(&session_id).unwrap().ready);

        assert_eq!(response.id, Some(RequestId::from("1")));
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "toolrelay");
    }

    #[tokio::test]
    async fn test_unsupported_version_gets_default() {
        let server = server();
        let init = request(
            "1",
            methods::INITIALIZE,
            Some(json!({"protocolVersion": "1999-01-01"})),
        );
        let (response, _) = reply(server.handle(None, init).await);
        assert_eq!(response.result.unwrap()["protocolVersion"], PROTOCOL_VERSION);

        let bare = request("2", methods::INITIALIZE, None);
        let (response, _) = reply(server.handle(None, bare).await);
        assert_eq!(response.result.unwrap()["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_missing_session_is_rejected() {
        let server = server();
        let dispatch = server.handle(None, request("2", methods::TOOLS_LIST, None)).await;
        assert_eq!(dispatch, Dispatch::Rejected(Rejection::MissingSession));
    }

    #[tokio::test]
    async fn test_unknown_session_is_rejected() {
        let server = server();
        let dispatch = server
            .handle(Some("bogus"), request("2", methods::TOOLS_LIST, None))
            .await;
        assert_eq!(dispatch, Dispatch::Rejected(Rejection::UnknownSession));
    }

    #[tokio::test]
    async fn test_unready_session_gets_error_envelope() {
        let server = server();
        let session_id = initialize(&server).await;

        for method in [methods::TOOLS_LIST, methods::TOOLS_CALL, "resources/list"] {
            let (response, _) =
                reply(server.handle(Some(session_id.as_str()), request("2", method, None)).await);
            assert_eq!(response.error.map(|e| e.code), Some(INVALID_REQUEST));
            assert!(response.result.is_none());
        }
    }

    #[tokio::test]
    async fn test_initialized_is_idempotent() {
        let server = server();
        let session_id = initialize(&server).await;

        for _ in 0..2 {
            let dispatch = server
                .handle(
                    Some(session_id.as_str()),
                    JsonRpcRequest::notification(methods::INITIALIZED, None),
                )
                .await;
            assert_eq!(
                dispatch,
                Dispatch::Accepted {
                    session_id: session_id.clone()
                }
            );
        }
        assert!(server.sessions().get(&session_id).unwrap().ready);
    }

    #[tokio::test]
    async fn test_other_notifications_are_acknowledged() {
        let server = server();
        let session_id = initialize(&server).await;
        let dispatch = server
            .handle(
                Some(session_id.as_str()),
                JsonRpcRequest::notification("notifications/cancelled", None),
            )
            .await;
        assert_matches!(dispatch, Dispatch::Accepted { .. });
        assert!(!server.sessions().get(&session_id).unwrap().ready);
    }

    #[tokio::test]
    async fn test_tools_list_after_handshake() {
        let server = server();
        let session_id = ready_session(&server).await;

        let (response, echoed) = reply(
            server
                .handle(Some(session_id.as_str()), request("2", methods::TOOLS_LIST, None))
                .await,
        );
        assert_eq!(echoed.as_deref(), Some(session_id.as_str()));
        let result = response.result.unwrap();
        assert_eq!(result["tools"][0]["name"], "echo");
        assert_eq!(result["tools"][0]["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_unknown_method_is_not_found() {
        let server = server();
        let session_id = ready_session(&server).await;

        let (response, _) = reply(
            server
                .handle(Some(session_id.as_str()), request("9", "resources/list", None))
                .await,
        );
        let error = response.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method 'resources/list' not found");
    }

    #[tokio::test]
    async fn test_tool_call_param_errors() {
        let server = server();
        let session_id = ready_session(&server).await;

        let (response, _) = reply(
            server
                .handle(Some(session_id.as_str()), request("3", methods::TOOLS_CALL, None))
                .await,
        );
        let error = response.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert_eq!(error.message, "Missing parameters");

        let (response, _) = reply(
            server
                .handle(
                    Some(session_id.as_str()),
                    request("4", methods::TOOLS_CALL, Some(json!({"arguments": {}}))),
                )
                .await,
        );
        let error = response.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert_eq!(error.message, "Missing required parameter: name");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_not_is_error() {
        let server = server();
        let session_id = ready_session(&server).await;

        let (response, _) = reply(
            server
                .handle(
                    Some(session_id.as_str()),
                    request("5", methods::TOOLS_CALL, Some(json!({"name": "nope"}))),
                )
                .await,
        );
        assert!(response.result.is_none());
        let error = response.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(error.message, "Tool 'nope' not found");
    }

    #[tokio::test]
    async fn test_failing_tool_is_success_envelope() {
        let server = server();
        let session_id = ready_session(&server).await;

        let (response, _) = reply(
            server
                .handle(
                    Some(session_id.as_str()),
                    request(
                        "6",
                        methods::TOOLS_CALL,
                        Some(json!({"name": "echo", "arguments": {"fail": true}})),
                    ),
                )
                .await,
        );
        assert!(response.error.is_none());
        let result: CallToolResult = serde_json::from_value(response.result.unwrap()).unwrap();
        assert!(result.is_error());
        assert_eq!(result.first_text(), Some("Tool execution error: echo refused"));
    }

    #[tokio::test]
    async fn test_tool_call_success_echoes_id() {
        let server = server();
        let session_id = ready_session(&server).await;

        let (response, _) = reply(
            server
                .handle(
                    Some(session_id.as_str()),
                    JsonRpcRequest::new(
                        RequestId::Number(42),
                        methods::TOOLS_CALL,
                        Some(json!({"name": "echo", "arguments": {"text": "hello"}})),
                    ),
                )
                .await,
        );
        assert_eq!(response.id, Some(RequestId::Number(42)));
        assert_eq!(
            response.result.unwrap(),
            json!({"content": [{"type": "text", "text": "hello"}]})
        );
    }

    #[tokio::test]
    async fn test_servers_do_not_share_sessions() {
        let a = server();
        let b = server();
        let session_id = ready_session(&a).await;

        let dispatch = b
            .handle(Some(session_id.as_str()), request("2", methods::TOOLS_LIST, None))
            .await;
        assert_eq!(dispatch, Dispatch::Rejected(Rejection::UnknownSession));
    }

    #[tokio::test]
    async fn test_wrong_jsonrpc_version() {
        let server = server();
        let mut req = request("1", methods::INITIALIZE, None);
        req.jsonrpc = "1.0".to_string();
        let (response, _) = reply(server.handle(None, req).await);
        assert_eq!(response.error.map(|e| e.code), Some(INVALID_REQUEST));
        assert!(server.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_session_gates_run_before_version_check() {
        let server = server();
        let mut req = request("2", methods::TOOLS_LIST, None);
        req.jsonrpc = "1.0".to_string();
        assert_eq!(
            server.handle(None, req.clone()).await,
            Dispatch::Rejected(Rejection::MissingSession)
        );
        assert_eq!(
            server.handle(Some("bogus"), req.clone()).await,
            Dispatch::Rejected(Rejection::UnknownSession)
        );

        let session_id = ready_session(&server).await;
        let (response, echoed) = reply(server.handle(Some(session_id.as_str()), req).await);
        assert_eq!(echoed.as_deref(), Some(session_id.as_str()));
        assert_eq!(response.error.map(|e| e.code), Some(INVALID_REQUEST));
    }
}
