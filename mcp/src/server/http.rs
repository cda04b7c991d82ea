//! HTTP transport for the MCP server
//!
//! One POST endpoint. Request bodies are single JSON-RPC objects; replies are
//! SSE streams holding one data frame and the `[DONE]` sentinel.

use super::{Dispatch, McpServer, Rejection};
use crate::protocol::{
    frame_stream, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, SESSION_ID_HEADER,
};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the router serving `server` on `path`
pub fn router(server: Arc<McpServer>, path: &str) -> Router {
    Router::new()
        .route(path, post(handle_post))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    server: Arc<McpServer>,
    path: &str,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(addr = %addr, path, "MCP HTTP server listening");

    axum::serve(listener, router(server, path))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Whether an `Accept` value lists both JSON and SSE
pub fn accepts_json_and_sse(accept: Option<&str>) -> bool {
    let Some(accept) = accept.filter(|a| !a.trim().is_empty()) else {
        return false;
    };

    let types: Vec<String> = accept
        .split(',')
        .map(|t| t.trim().to_ascii_lowercase())
        .collect();
    let has_json = types.iter().any(|t| t.contains("application/json"));
    let has_sse = types.iter().any(|t| t.contains("text/event-stream"));
    has_json && has_sse
}

async fn handle_post(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let accept = headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(",");
    if !accepts_json_and_sse(Some(&accept)) {
        return dispatch_response(Dispatch::Rejected(Rejection::NotAcceptable));
    }

    let request = match decode_request(&body) {
        Ok(request) => request,
        Err(rejection) => return dispatch_response(Dispatch::Rejected(rejection)),
    };

    let session_id = headers
        .get(SESSION_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty());

    dispatch_response(server.handle(session_id, request).await)
}

fn decode_request(body: &str) -> Result<JsonRpcRequest, Rejection> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| Rejection::Parse(e.to_string()))?;
    if value.is_array() {
        return Err(Rejection::Batch);
    }
    serde_json::from_value(value).map_err(|e| Rejection::Invalid(e.to_string()))
}

/// Turn a dispatcher outcome into an HTTP response
pub fn dispatch_response(dispatch: Dispatch) -> Response {
    match dispatch {
        Dispatch::Reply {
            response,
            session_id,
        } => sse_response(&response, session_id.as_deref()),
        Dispatch::Accepted { session_id } => {
            let mut resp = StatusCode::NO_CONTENT.into_response();
            attach_session(&mut resp, Some(&session_id));
            resp
        }
        Dispatch::Rejected(rejection) => rejection_response(rejection),
    }
}

fn sse_response(response: &JsonRpcResponse, session_id: Option<&str>) -> Response {
    let body = match frame_stream(std::slice::from_ref(response)) {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Failed to frame response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut resp = Response::new(Body::from(body));
    let headers = resp.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    attach_session(&mut resp, session_id);
    resp
}

fn rejection_response(rejection: Rejection) -> Response {
    let server_error = Some(RequestId::from("server-error"));
    let (status, envelope) = match rejection {
        Rejection::NotAcceptable => (
            StatusCode::NOT_ACCEPTABLE,
            JsonRpcResponse::error(
                server_error,
                JsonRpcError::invalid_request(
                    "Client must accept both application/json and text/event-stream",
                ),
            ),
        ),
        Rejection::MissingSession => (
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::error(server_error, JsonRpcError::session("Missing session ID")),
        ),
        Rejection::UnknownSession => {
            return (StatusCode::BAD_REQUEST, "No valid session ID provided").into_response();
        }
        Rejection::Parse(detail) => (
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::error(None, JsonRpcError::parse_error(detail)),
        ),
        Rejection::Invalid(detail) => (
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::error(
                None,
                JsonRpcError::invalid_request(format!("Invalid request: {}", detail)),
            ),
        ),
        Rejection::Batch => (
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::error(None, JsonRpcError::invalid_request("Batching not supported")),
        ),
    };

    let body = serde_json::to_string(&envelope).unwrap_or_else(|_| "{}".to_string());
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

fn attach_session(resp: &mut Response, session_id: Option<&str>) {
    if let Some(value) = session_id.and_then(|sid| HeaderValue::from_str(sid).ok()) {
        resp.headers_mut()
            .insert(HeaderName::from_static("mcp-session-id"), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::jsonrpc::{INVALID_REQUEST, PARSE_ERROR};
    use crate::protocol::{parse_sse, PROTOCOL_VERSION};
    use serde_json::json;

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_accept_requires_both_types() {
        assert!(accepts_json_and_sse(Some("application/json, text/event-stream")));
        assert!(accepts_json_and_sse(Some("TEXT/EVENT-STREAM;q=0.9,Application/JSON")));
        assert!(!accepts_json_and_sse(Some("application/json")));
        assert!(!accepts_json_and_sse(Some("text/event-stream")));
        assert!(!accepts_json_and_sse(Some("")));
        assert!(!accepts_json_and_sse(None));
    }

    #[test]
    fn test_decode_request_rejections() {
        assert!(matches!(decode_request("{nope"), Err(Rejection::Parse(_))));
        assert_eq!(decode_request("[]"), Err(Rejection::Batch));
        assert!(matches!(
            decode_request(r#"{"jsonrpc":"2.0","id":1}"#),
            Err(Rejection::Invalid(_))
        ));
        assert!(decode_request(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).is_ok());
    }

    #[tokio::test]
    async fn test_reply_is_sse_with_session_header() {
        let response = JsonRpcResponse::success(
            Some(RequestId::from("1")),
            json!({"protocolVersion": PROTOCOL_VERSION}),
        );
        let resp = dispatch_response(Dispatch::Reply {
            response: response.clone(),
            session_id: Some("abc".to_string()),
        });

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(resp.headers()[SESSION_ID_HEADER], "abc");

        let text = body_text(resp).await;
        assert!(text.ends_with("data: [DONE]\n\n"));
        let parsed: JsonRpcResponse = parse_sse(&text).unwrap();
        assert_eq!(parsed, response);
    }

    #[tokio::test]
    async fn test_accepted_is_empty_204() {
        let resp = dispatch_response(Dispatch::Accepted {
            session_id: "abc".to_string(),
        });
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()[SESSION_ID_HEADER], "abc");
        assert!(body_text(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_not_acceptable_envelope() {
        let resp = dispatch_response(Dispatch::Rejected(Rejection::NotAcceptable));
        assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);

        let envelope: JsonRpcResponse = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(envelope.id, Some(RequestId::from("server-error")));
        assert_eq!(envelope.error.map(|e| e.code), Some(INVALID_REQUEST));
    }

    #[tokio::test]
    async fn test_session_rejections_are_400() {
        let resp = dispatch_response(Dispatch::Rejected(Rejection::MissingSession));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let envelope: JsonRpcResponse = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(envelope.error.unwrap().message, "Missing session ID");

        let resp = dispatch_response(Dispatch::Rejected(Rejection::UnknownSession));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(resp).await, "No valid session ID provided");
    }

    #[tokio::test]
    async fn test_parse_error_envelope() {
        let resp = dispatch_response(Dispatch::Rejected(Rejection::Parse("eof".to_string())));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let envelope: JsonRpcResponse = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(envelope.id, None);
        assert_eq!(envelope.error.map(|e| e.code), Some(PARSE_ERROR));
    }
}
