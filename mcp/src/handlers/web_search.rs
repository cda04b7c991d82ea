//! Web search tool
//!
//! Forwards the query to a search-grounded chat completion deployment behind
//! an OpenAI-compatible proxy and returns the model's answer.

use crate::error::{McpError, ToolError};
use crate::server::Tool;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://ai-proxy.lab.epam.com";
pub const DEFAULT_DEPLOYMENT: &str = "gemini-2.0-flash-exp-google-search";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const API_KEY_HEADER: &str = "api-key";

pub struct WebSearchTool {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl WebSearchTool {
    pub const NAME: &'static str = "web_search";

    pub fn new(
        endpoint: &str,
        deployment: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(McpError::Internal(
                "web_search requires a non-empty API key".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| McpError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: completions_url(endpoint, deployment),
            api_key,
        })
    }

    /// Chat completions URL requests are sent to
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for WebSearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSearchTool")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// `<endpoint>/openai/deployments/<deployment>/chat/completions`
pub fn completions_url(endpoint: &str, deployment: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions",
        endpoint.trim_end_matches('/'),
        deployment
    )
}

pub fn build_request_body(query: &str) -> Value {
    json!({
        "messages": [
            {"role": "user", "content": query}
        ]
    })
}

/// Pull the answer out of a chat completion body.
pub fn extract_answer(body: &Value) -> Result<String, ToolError> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| error.as_str().map(str::to_string))
            .unwrap_or_else(|| error.to_string());
        return Err(ToolError::new(message));
    }

    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolError::new("Completion response has no message content"))
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Performs WEB search"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "request": {
                    "type": "string",
                    "description": "The search query or question to search for on the web"
                }
            },
            "required": ["request"]
        })
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let query = match arguments.get("request") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return Err(ToolError::new("Missing required argument: 'request'")),
        };

        debug!(chars = query.len(), "Web search request");

        let api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| ToolError::new(format!("Invalid API key header: {}", e)))?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(API_KEY_HEADER, api_key)
            .json(&build_request_body(&query))
            .send()
            .await
            .map_err(|e| ToolError::new(format!("Web search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Web search returned an error status");
            return Err(ToolError::new(format!("Error: {} {}", status.as_u16(), body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolError::new(format!("Invalid completion response: {}", e)))?;
        extract_answer(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_completions_url() {
        assert_eq!(
            completions_url("https://proxy.example/", "search-model"),
            "https://proxy.example/openai/deployments/search-model/chat/completions"
        );
    }

    #[test]
    fn test_request_body() {
        assert_eq!(
            build_request_body("rust release date"),
            json!({"messages": [{"role": "user", "content": "rust release date"}]})
        );
    }

    #[test]
    fn test_extract_answer() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "2015"}}]});
        assert_eq!(extract_answer(&body).unwrap(), "2015");
    }

    #[test]
    fn test_extract_error_member() {
        let body = json!({"error": {"message": "quota exceeded", "code": "429"}});
        assert_eq!(
            extract_answer(&body).unwrap_err(),
            ToolError::new("quota exceeded")
        );

        let body = json!({"error": "bad key"});
        assert_eq!(extract_answer(&body).unwrap_err(), ToolError::new("bad key"));
    }

    #[test]
    fn test_extract_missing_content() {
        assert!(extract_answer(&json!({"choices": []})).is_err());
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let err = WebSearchTool::new(DEFAULT_ENDPOINT, DEFAULT_DEPLOYMENT, " ", DEFAULT_TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, McpError::Internal(_)));
    }

    async fn fake_completions(
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) != Some("secret") {
            return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "no key"})));
        }
        let question = body["messages"][0]["content"].as_str().unwrap_or_default();
        (
            StatusCode::OK,
            Json(json!({"choices": [{"message": {"content": format!("answer to {}", question)}}]})),
        )
    }

    async fn spawn_proxy() -> String {
        let app = Router::new().route(
            "/openai/deployments/test/chat/completions",
            post(fake_completions),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_execute_against_local_proxy() {
        let endpoint = spawn_proxy().await;

        let tool = WebSearchTool::new(&endpoint, "test", "secret", DEFAULT_TIMEOUT).unwrap();
        let answer = tool.execute(&json!({"request": "why"})).await.unwrap();
        assert_eq!(answer, "answer to why");

        let tool = WebSearchTool::new(&endpoint, "test", "wrong", DEFAULT_TIMEOUT).unwrap();
        let err = tool.execute(&json!({"request": "why"})).await.unwrap_err();
        assert!(err.to_string().starts_with("Error: 401"));
    }

    #[tokio::test]
    async fn test_execute_requires_request() {
        let tool =
            WebSearchTool::new(DEFAULT_ENDPOINT, DEFAULT_DEPLOYMENT, "secret", DEFAULT_TIMEOUT)
                .unwrap();
        let err = tool.execute(&json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument: 'request'");
    }
}
