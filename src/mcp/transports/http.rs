//! HTTP transport for remote MCP servers.
//!
//! Each JSON-RPC frame is a POST. The server may answer with
//! `application/json` or with a `text/event-stream` body carrying the
//! response as a single event. A session id issued on `initialize` is echoed
//! on every later request.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;

use super::{extract_result, notification_frame, request_frame, McpTransport};
use crate::mcp::error::McpError;

/// Header carrying the server-issued session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

const ACCEPT_BOTH: &str = "application/json, text/event-stream";

pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
    next_id: AtomicU64,
    session_id: Mutex<Option<String>>,
}

impl HttpTransport {
    pub fn new(
        url: &str,
        headers: BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let client = reqwest::Client::builder()
            .default_headers(header_map(&headers)?)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.to_string(),
            client,
            timeout,
            next_id: AtomicU64::new(1),
            session_id: Mutex::new(None),
        })
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    async fn post(&self, method: &str, frame: &Value) -> Result<reqwest::Response, McpError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(ACCEPT, ACCEPT_BOTH)
            .json(frame);
        if let Some(session) = self.session_id() {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify(method, e))?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock() = Some(session.to_string());
        }

        response
            .error_for_status()
            .map_err(|e| self.classify(method, e))
    }

    fn classify(&self, method: &str, error: reqwest::Error) -> McpError {
        if error.is_timeout() {
            McpError::Timeout {
                method: method.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            McpError::Http(error)
        }
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = Value::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        let response = self.post(method, &request_frame(&id, method, params)).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| self.classify(method, e))?;

        extract_result(parse_response_body(content_type.as_deref(), &body)?)
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), McpError> {
        self.post(method, &notification_frame(method, params)).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), McpError> {
        let session = self.session_id.lock().take();
        let Some(session) = session else {
            return Ok(());
        };
        // Servers may not support explicit termination.
        if let Err(e) = self
            .client
            .delete(&self.url)
            .header(SESSION_HEADER, session)
            .send()
            .await
        {
            log::debug!("Session termination for {} failed: {}", self.url, e);
        }
        Ok(())
    }

    fn server_identifier(&self) -> String {
        format!("http:{}", self.url)
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, McpError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| McpError::protocol(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| McpError::protocol(format!("invalid value for header '{}': {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Decode a response body as JSON or as an event stream.
pub(crate) fn parse_response_body(content_type: Option<&str>, body: &str) -> Result<Value, McpError> {
    let is_stream = content_type.map_or(false, |ct| ct.starts_with("text/event-stream"));
    if is_stream {
        parse_sse_body(body)
    } else {
        Ok(serde_json::from_str(body)?)
    }
}

/// First event in `body` whose `data` is a JSON value.
///
/// Multi-line `data:` fields within one event are joined with `\n`.
pub(crate) fn parse_sse_body(body: &str) -> Result<Value, McpError> {
    let mut data = Vec::new();
    for line in body.lines().chain(std::iter::once("")) {
        if line.is_empty() {
            if !data.is_empty() {
                if let Ok(value) = serde_json::from_str::<Value>(&data.join("\n")) {
                    return Ok(value);
                }
                data.clear();
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    Err(McpError::protocol("event stream carried no JSON-RPC message"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap as AxumHeaders, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    #[test]
    fn test_parse_sse_body() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n";
        assert_eq!(parse_sse_body(body).unwrap()["id"], 1);

        // Data split across lines, CRLF endings, no trailing blank line.
        let body = "data: {\"id\": 2,\r\ndata: \"result\": true}";
        assert_eq!(parse_sse_body(body).unwrap()["result"], true);

        // Non-JSON keep-alive event before the real one.
        let body = ": ping\ndata: hello\n\ndata: {\"id\":3}\n\n";
        assert_eq!(parse_sse_body(body).unwrap()["id"], 3);

        assert!(matches!(parse_sse_body("event: x\n\n"), Err(McpError::Protocol(_))));
    }

    #[test]
    fn test_parse_response_body_by_content_type() {
        let json_body = r#"{"id":1,"result":{}}"#;
        assert_eq!(parse_response_body(Some("application/json"), json_body).unwrap()["id"], 1);
        assert_eq!(parse_response_body(None, json_body).unwrap()["id"], 1);
        assert!(parse_response_body(Some("application/json"), "not json").is_err());
        assert_eq!(
            parse_response_body(Some("text/event-stream; charset=utf-8"), "data: {\"id\":9}\n\n")
                .unwrap()["id"],
            9
        );
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        assert!(HttpTransport::new("http://localhost/mcp", headers, Duration::from_secs(1)).is_err());
    }

    async fn handle(headers: AxumHeaders, Json(body): Json<Value>) -> Response {
        let id = body["id"].clone();
        match body["method"].as_str() {
            Some("initialize") => (
                [(SESSION_HEADER, "sess-1")],
                Json(json!({"jsonrpc": "2.0", "id": id, "result": {"protocolVersion": "2024-11-05"}})),
            )
                .into_response(),
            Some("notifications/initialized") => StatusCode::ACCEPTED.into_response(),
            Some("stream") => (
                [(header::CONTENT_TYPE, "text/event-stream")],
                format!(
                    "event: message\ndata: {}\n\n",
                    json!({"jsonrpc": "2.0", "id": id, "result": {"streamed": true}})
                ),
            )
                .into_response(),
            Some("fail") => Json(json!({
                "jsonrpc": "2.0", "id": id,
                "error": {"code": -32000, "message": "boom"}
            }))
            .into_response(),
            _ => {
                let session = headers
                    .get(SESSION_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let token = headers
                    .get("x-api-key")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Json(json!({
                    "jsonrpc": "2.0", "id": id,
                    "result": {"session": session, "token": token}
                }))
                .into_response()
            }
        }
    }

    async fn serve() -> String {
        let app = Router::new().route("/mcp", post(handle));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/mcp", addr)
    }

    #[tokio::test]
    async fn test_session_and_headers_round_trip() {
        let url = serve().await;
        let mut headers = BTreeMap::new();
        headers.insert("x-api-key".to_string(), "secret".to_string());
        let transport = HttpTransport::new(&url, headers, Duration::from_secs(5)).unwrap();

        let init = transport.request("initialize", json!({})).await.unwrap();
        assert_eq!(init["protocolVersion"], "2024-11-05");
        assert_eq!(transport.session_id().as_deref(), Some("sess-1"));

        transport.notify("notifications/initialized", json!({})).await.unwrap();

        let echoed = transport.request("tools/list", json!({})).await.unwrap();
        assert_eq!(echoed["session"], "sess-1");
        assert_eq!(echoed["token"], "secret");

        let streamed = transport.request("stream", json!({})).await.unwrap();
        assert_eq!(streamed["streamed"], true);

        let err = transport.request("fail", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::Rpc { code: -32000, .. }));

        transport.close().await.unwrap();
        assert!(transport.session_id().is_none());
        assert_eq!(transport.server_identifier(), format!("http:{}", url));
    }
}
