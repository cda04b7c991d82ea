//! MCP client over the HTTP + SSE transport
//!
//! [`McpClient::connect`] performs the whole handshake (`initialize` followed
//! by `notifications/initialized`) or nothing: on failure no session is kept.
//! Every later request carries the session header, and a session id seen on
//! any response replaces the stored one.

use crate::error::{ClientError, ProtocolError};
use crate::protocol::{
    encode_notification, encode_request, methods, parse_sse, CallToolParams, CallToolResult,
    Implementation, InitializeParams, InitializeResult, JsonRpcResponse, ListToolsResult,
    RequestId, ToolDescriptor, PROTOCOL_VERSION, SESSION_ID_HEADER,
};
use parking_lot::Mutex;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Text returned by [`McpClient::call_tool`] when the result has no content
pub const EMPTY_RESULT_SENTINEL: &str = "Unexpected error occurred!";

const ACCEPT_VALUE: &str = "application/json, text/event-stream";

/// Client tunables
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request deadline
    pub timeout: Duration,
    pub client_name: String,
    pub client_version: String,
    /// Version proposed in `initialize`
    pub protocol_version: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            client_name: "toolrelay-client".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Connection {
    endpoint: Url,
    session_id: Option<String>,
}

/// MCP client
#[derive(Debug)]
pub struct McpClient {
    http: reqwest::Client,
    options: ClientOptions,
    connection: Mutex<Option<Connection>>,
    next_id: AtomicU64,
}

impl McpClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http,
            options,
            connection: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    /// Current session id, if connected
    pub fn session_id(&self) -> Option<String> {
        self.connection
            .lock()
            .as_ref()
            .and_then(|c| c.session_id.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.session_id().is_some()
    }

    /// Forget the current session
    pub fn disconnect(&self) {
        *self.connection.lock() = None;
    }

    /// Open a session against `url`.
    ///
    /// Any failure leaves the client disconnected and is reported as
    /// [`ClientError::Connection`].
    pub async fn connect(&self, url: &str) -> Result<InitializeResult, ClientError> {
        self.disconnect();

        match self.handshake(url).await {
            Ok(result) => {
                info!(
                    url,
                    session_id = ?self.session_id(),
                    protocol_version = %result.protocol_version,
                    server = %result.server_info.name,
                    "Connected to MCP server"
                );
                Ok(result)
            }
            Err(e) => {
                self.disconnect();
                warn!(url, error = %e, "MCP handshake failed");
                Err(ClientError::Connection(Box::new(e)))
            }
        }
    }

    async fn handshake(&self, url: &str) -> Result<InitializeResult, ClientError> {
        let endpoint = Url::parse(url)?;
        *self.connection.lock() = Some(Connection {
            endpoint,
            session_id: None,
        });

        let params = InitializeParams {
            protocol_version: self.options.protocol_version.clone(),
            capabilities: json!({"tools": {}}),
            client_info: Implementation {
                name: self.options.client_name.clone(),
                version: self.options.client_version.clone(),
            },
        };
        let params = serde_json::to_value(params).map_err(ProtocolError::from)?;
        let result = self.request(methods::INITIALIZE, Some(params)).await?;
        let result: InitializeResult =
            serde_json::from_value(result).map_err(ProtocolError::from)?;

        if self.session_id().is_none() {
            return Err(ProtocolError::InvalidResponse(
                "initialize response carried no session id".to_string(),
            )
            .into());
        }

        self.notify(methods::INITIALIZED, None).await?;
        Ok(result)
    }

    /// List the server's tools
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ClientError> {
        self.ensure_connected()?;
        let result = self.request(methods::TOOLS_LIST, None).await?;
        let list: ListToolsResult = serde_json::from_value(result).map_err(ProtocolError::from)?;
        Ok(list.tools)
    }

    /// Call a tool and return the text of its first content item.
    ///
    /// An empty result yields [`EMPTY_RESULT_SENTINEL`]; a first item without
    /// text yields `""`. Tool-level failures come back as text too; use
    /// [`McpClient::call_tool_result`] to see `isError`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, ClientError> {
        let result = self.call_tool_result(name, arguments).await?;
        Ok(result_text(&result).to_string())
    }

    /// Call a tool and return the full result.
    pub async fn call_tool_result(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, ClientError> {
        self.ensure_connected()?;

        let params = CallToolParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };
        let params = serde_json::to_value(params).map_err(ProtocolError::from)?;

        let result = match self.request(methods::TOOLS_CALL, Some(params)).await {
            Ok(result) => result,
            Err(ClientError::Http(e)) if e.is_timeout() => {
                return Err(ClientError::OutcomeUnknown(name.to_string()));
            }
            Err(e) => return Err(e),
        };

        Ok(serde_json::from_value(result).map_err(ProtocolError::from)?)
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::from(self.next_id.fetch_add(1, Ordering::Relaxed).to_string())
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let id = self.next_request_id();
        debug!(method, id = %id, "Sending request");

        let body = encode_request(method, params, id)?;
        let response = self.post(body).await?.ok_or_else(|| {
            ProtocolError::InvalidResponse(format!("empty response to '{}'", method))
        })?;

        let result = response.into_result()?;
        if let Some(session_id) = result.get("sessionId").and_then(Value::as_str) {
            self.update_session(session_id);
        }
        Ok(result)
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        debug!(method, "Sending notification");
        let body = encode_notification(method, params)?;
        self.post(body).await?;
        Ok(())
    }

    /// POST one encoded message. `None` when the server answered without a body.
    async fn post(&self, body: Vec<u8>) -> Result<Option<JsonRpcResponse>, ClientError> {
        let connection = self
            .connection
            .lock()
            .clone()
            .ok_or(ClientError::NotConnected)?;

        let mut request = self
            .http
            .post(connection.endpoint)
            .header(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body);
        if let Some(session_id) = &connection.session_id {
            request = request.header(SESSION_ID_HEADER, session_id.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if let Some(session_id) = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|s| !s.is_empty())
        {
            self.update_session(session_id);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);

        let text = response.text().await?;
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(None);
        }

        let envelope = if is_json {
            serde_json::from_str(&text).map_err(ProtocolError::from)?
        } else {
            parse_sse(&text)?
        };
        Ok(Some(envelope))
    }

    fn update_session(&self, session_id: &str) {
        if let Some(connection) = self.connection.lock().as_mut() {
            if connection.session_id.as_deref() != Some(session_id) {
                debug!(session_id, "Session id updated");
                connection.session_id = Some(session_id.to_string());
            }
        }
    }
}

/// Text [`McpClient::call_tool`] reports for `result`
pub fn result_text(result: &CallToolResult) -> &str {
    match result.content.first() {
        Some(item) => item.as_text().unwrap_or_default(),
        None => EMPTY_RESULT_SENTINEL,
    }
}
