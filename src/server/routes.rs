//! Axum route handlers for the bridge HTTP server.
//!
//! # Routes
//!
//! - `GET    /health`                            Liveness probe
//! - `POST   /discover`                          Scan a tree, register the agents found
//! - `GET    /agents`                            Query registered agents
//! - `GET    /agents/:id`                        One agent (counts as an access)
//! - `POST   /agents/:id/status`                 Set `active` / `offline`
//! - `POST   /agents/:id/execute`                Run one capability
//! - `POST   /agents/:id/execute-batch`          Run several capabilities in order
//! - `GET    /agents/:id/translate/:framework`   Framework-specific descriptor
//! - `GET    /stats`                             Registry statistics
//! - `DELETE /cache`                             Empty both registries
//! - `GET    /servers`, `POST /servers`          Protocol server records

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::{build_server_config, ToolSpec, TransportDescriptor};
use crate::bridge::{translate_for_framework, BatchCall, RuntimeBridge};
use crate::capabilities::ResourceRef;
use crate::config::BridgeConfig;
use crate::discovery::{DiscoveredAgent, DiscoveryEngine, DiscoveryError};
use crate::error::BridgeError;
use crate::registry::{AgentStatus, DiscoveryFilter, Registry, RegistryItem, RegistryRecord};

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BridgeConfig>,
    pub engine: Arc<DiscoveryEngine>,
    /// Agents found by discovery, keyed by agent id.
    pub agents: Arc<Registry<DiscoveredAgent>>,
    /// Protocol server records, keyed by content-hash id.
    pub servers: Arc<Registry<RegistryRecord>>,
    pub bridge: Arc<RuntimeBridge>,
}

impl AppState {
    pub fn new(config: BridgeConfig) -> Self {
        let prefix = config.registry.namespace_prefix.clone();
        Self {
            engine: Arc::new(DiscoveryEngine::new(config.discovery.clone())),
            agents: Arc::new(Registry::new(prefix.clone())),
            servers: Arc::new(Registry::new(format!("{}-servers", prefix))),
            bridge: Arc::new(RuntimeBridge::new(config.execution.clone())),
            config: Arc::new(config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/discover", post(discover_handler))
        .route("/agents", get(list_agents_handler))
        .route("/agents/:id", get(get_agent_handler))
        .route("/agents/:id/status", post(update_status_handler))
        .route("/agents/:id/execute", post(execute_handler))
        .route("/agents/:id/execute-batch", post(execute_batch_handler))
        .route("/agents/:id/translate/:framework", get(translate_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/servers", get(list_servers_handler).post(register_server_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "ossa-bridge",
        "agents": state.agents.len(),
        "servers": state.servers.len(),
    }))
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DiscoverRequest {
    pub root: PathBuf,
    /// Also register a server record for every agent with an endpoint.
    #[serde(default)]
    pub register_servers: bool,
}

/// POST /discover: scan `root` and register every agent found.
async fn discover_handler(
    State(state): State<AppState>,
    Json(request): Json<DiscoverRequest>,
) -> Result<Json<Value>, ApiError> {
    let report = state
        .engine
        .discover_with_report(&request.root)
        .await
        .map_err(|e| match e {
            DiscoveryError::InvalidRoot(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
            other => api_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

    let new_agents = state.agents.register_snapshot(report.agents.iter().cloned());

    let mut registered_servers = Vec::new();
    if request.register_servers {
        let prefix = &state.config.registry.namespace_prefix;
        for agent in report.agents.iter().filter(|a| a.endpoint.is_some()) {
            match RegistryRecord::from_discovered(agent, prefix) {
                Ok(record) => {
                    registered_servers.push(record.id.clone());
                    state.servers.register(record);
                }
                Err(e) => log::warn!("Could not build server record for '{}': {}", agent.id, e),
            }
        }
    }

    let mut body = serde_json::to_value(&report)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if let Value::Object(map) = &mut body {
        map.insert("new_agents".into(), json!(new_agents));
        map.insert("registered_servers".into(), json!(registered_servers));
    }
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Query string for `GET /agents` and `GET /servers`. List values are
/// comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct RegistryQuery {
    pub tag: Option<String>,
    pub name: Option<String>,
    pub min_confidence: Option<f64>,
    pub source: Option<String>,
    pub limit: Option<usize>,
    /// Tags tried in order when `tag` matches nothing. Other filters are
    /// ignored on this path.
    pub fallback: Option<String>,
}

fn split_list(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

impl RegistryQuery {
    fn filter(&self) -> Result<DiscoveryFilter, ApiError> {
        let mut filter = DiscoveryFilter::new();
        if let Some(tags) = &self.tag {
            for tag in split_list(tags) {
                filter = filter.with_tag(tag);
            }
        }
        if let Some(pattern) = &self.name {
            filter = filter
                .with_name_pattern(pattern)
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        }
        if let Some(min) = self.min_confidence {
            filter = filter.with_min_confidence(min);
        }
        if let Some(source) = &self.source {
            filter = filter.with_source_path_contains(source.clone());
        }
        if let Some(limit) = self.limit {
            filter = filter.with_limit(limit);
        }
        Ok(filter)
    }

    fn run<T: RegistryItem + serde::Serialize>(&self, registry: &Registry<T>) -> Result<Value, ApiError> {
        let entries = match (&self.tag, &self.fallback) {
            (Some(tag), Some(fallback)) => {
                registry.discover_with_fallback(tag.trim(), &split_list(fallback))
            }
            _ => registry.discover(&self.filter()?),
        };
        serde_json::to_value(entries).map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}

/// GET /agents
async fn list_agents_handler(
    State(state): State<AppState>,
    Query(query): Query<RegistryQuery>,
) -> Result<Json<Value>, ApiError> {
    query.run(&state.agents).map(Json)
}

fn agent_or_404(state: &AppState, id: &str) -> Result<DiscoveredAgent, ApiError> {
    state
        .agents
        .get(id)
        .map(|entry| entry.item)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("agent '{}' not found", id)))
}

/// GET /agents/:id
async fn get_agent_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .agents
        .get(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("agent '{}' not found", id)))?;
    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: AgentStatus,
}

/// POST /agents/:id/status
async fn update_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Value>, ApiError> {
    if !state.agents.update_agent_status(&id, request.status) {
        return Err(api_error(StatusCode::NOT_FOUND, format!("agent '{}' not found", id)));
    }
    Ok(Json(json!({ "id": id, "status": request.status })))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub capability: String,
    #[serde(default)]
    pub input: Value,
    pub timeout_ms: Option<u64>,
}

/// POST /agents/:id/execute: always 200 with an envelope once the agent and
/// capability resolve.
async fn execute_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ExecuteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = agent_or_404(&state, &id)?;
    let capability = agent.find_capability(&request.capability).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("agent '{}' has no capability '{}'", id, request.capability),
        )
    })?;
    let result = state
        .bridge
        .execute_capability(
            &agent,
            capability,
            request.input,
            request.timeout_ms.map(Duration::from_millis),
        )
        .await;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteBatchRequest {
    pub calls: Vec<BatchCall>,
    pub timeout_ms: Option<u64>,
}

/// POST /agents/:id/execute-batch
async fn execute_batch_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ExecuteBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let agent = agent_or_404(&state, &id)?;
    let results = state
        .bridge
        .execute_batch(&agent, &request.calls, request.timeout_ms.map(Duration::from_millis))
        .await;
    Ok(Json(results))
}

/// GET /agents/:id/translate/:framework
async fn translate_handler(
    State(state): State<AppState>,
    Path((id, framework)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let agent = agent_or_404(&state, &id)?;
    translate_for_framework(&agent, &framework)
        .map(Json)
        .map_err(|e| match e {
            BridgeError::UnsupportedFramework(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
            other => api_error(StatusCode::UNPROCESSABLE_ENTITY, other.to_string()),
        })
}

// ---------------------------------------------------------------------------
// Registry maintenance
// ---------------------------------------------------------------------------

/// GET /stats
async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "agents": state.agents.get_stats(),
        "servers": state.servers.get_stats(),
    }))
}

/// DELETE /cache
async fn clear_cache_handler(State(state): State<AppState>) -> StatusCode {
    state.agents.clear_cache();
    state.servers.clear_cache();
    log::info!("Registry caches cleared");
    StatusCode::NO_CONTENT
}

// ---------------------------------------------------------------------------
// Servers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterServerRequest {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub agent_id: String,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    #[serde(default)]
    pub resources: Vec<ResourceRef>,
    pub transport: TransportDescriptor,
}

/// GET /servers
async fn list_servers_handler(
    State(state): State<AppState>,
    Query(query): Query<RegistryQuery>,
) -> Result<Json<Value>, ApiError> {
    query.run(&state.servers).map(Json)
}

/// POST /servers: 201 for a new record, 200 when the same configuration was
/// already registered.
async fn register_server_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterServerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let config = build_server_config(
        &request.agent_id,
        &request.tools,
        &request.resources,
        &request.transport,
    )
    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let record = RegistryRecord::from_server_config(request.name, request.tags, config);
    let id = record.id.clone();
    let created = state.servers.register(record);
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(json!({ "id": id, "created": created }))))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capability;
    use crate::discovery::AgentFormat;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn seeded_state() -> AppState {
        let state = AppState::default();
        state.agents.register(
            DiscoveredAgent::new("echoer", "Echoer", AgentFormat::Unknown, "/repo/echo.py", 0.3)
                .with_metadata("role", json!("Parrot"))
                .with_capability(Capability::new("repeat", "Repeat Input").with_description("Repeat")),
        );
        state
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, json) = send(app_router(AppState::default()), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::VERSION);
        assert_eq!(json["service"], "ossa-bridge");
    }

    #[tokio::test]
    async fn test_discover_then_query() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("mcp.json"),
            r#"{"mcpServers": {"files": {"command": "npx", "args": ["-y", "fs-server"]}}}"#,
        )
        .unwrap();

        let state = AppState::default();
        let app = app_router(state.clone());

        let (status, json) = send(
            app.clone(),
            "POST",
            "/discover",
            Some(json!({ "root": dir.path(), "register_servers": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["agents"][0]["id"], "files");
        assert_eq!(json["new_agents"], 1);
        assert_eq!(json["registered_servers"].as_array().unwrap().len(), 1);
        assert_eq!(state.servers.len(), 1);

        let (_, agents) = send(app.clone(), "GET", "/agents?tag=mcp", None).await;
        assert_eq!(agents.as_array().unwrap().len(), 1);
        assert_eq!(agents[0]["cache_key"], "ossa:files");

        let (_, none) = send(app.clone(), "GET", "/agents?tag=langchain", None).await;
        assert!(none.as_array().unwrap().is_empty());

        let (_, fallback) = send(app.clone(), "GET", "/agents?tag=langchain&fallback=crewai,mcp", None).await;
        assert_eq!(fallback[0]["item"]["id"], "files");

        let (status, _) = send(app.clone(), "GET", "/agents?name=(unclosed", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            app,
            "POST",
            "/discover",
            Some(json!({ "root": dir.path().join("missing") })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_agent_lookup_and_status() {
        let state = seeded_state();
        let app = app_router(state.clone());

        let (status, json) = send(app.clone(), "GET", "/agents/echoer", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["item"]["name"], "Echoer");
        assert_eq!(json["status"], "offline");

        let (status, _) = send(app.clone(), "GET", "/agents/nobody", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/agents/echoer/status",
            Some(json!({ "status": "active" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "active");
        assert_eq!(state.agents.peek("echoer").unwrap().status, AgentStatus::Active);

        let (status, _) = send(app, "POST", "/agents/nobody/status", Some(json!({ "status": "active" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_execute_and_translate() {
        let app = app_router(seeded_state());

        let (status, json) = send(
            app.clone(),
            "POST",
            "/agents/echoer/execute",
            Some(json!({ "capability": "Repeat Input", "input": {"x": 1} })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["result"]["echo"]["x"], 1);
        assert_eq!(json["result"]["fallback"], true);
        assert_eq!(json["framework_used"], "unknown");

        let (status, _) = send(
            app.clone(),
            "POST",
            "/agents/echoer/execute",
            Some(json!({ "capability": "fly" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = send(
            app.clone(),
            "POST",
            "/agents/echoer/execute-batch",
            Some(json!({ "calls": [{"capability": "repeat", "input": 1}, {"capability": "fly"}] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["success"], true);
        assert_eq!(json[1]["success"], false);

        let (status, json) = send(app.clone(), "GET", "/agents/echoer/translate/openai", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["tools"][0]["function"]["name"], "repeat_input");

        let (_, json) = send(app.clone(), "GET", "/agents/echoer/translate/crewai", None).await;
        assert_eq!(json["role"], "Parrot");

        let (status, json) = send(app, "GET", "/agents/echoer/translate/autogen", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("autogen"));
    }

    #[tokio::test]
    async fn test_servers_stats_and_cache() {
        let state = seeded_state();
        let app = app_router(state.clone());
        let server = json!({
            "name": "Research",
            "tags": ["research"],
            "agent_id": "research",
            "tools": [{"name": "search", "description": "Search"}],
            "transport": {"type": "network", "url": "http://localhost:9000/mcp"}
        });

        let (status, first) = send(app.clone(), "POST", "/servers", Some(server.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(first["id"].as_str().unwrap().starts_with("srv-"));

        let (status, second) = send(app.clone(), "POST", "/servers", Some(server)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["id"], second["id"]);
        assert_eq!(second["created"], false);

        let (status, _) = send(
            app.clone(),
            "POST",
            "/servers",
            Some(json!({
                "name": "Broken",
                "agent_id": "",
                "transport": {"type": "stdio", "command": "x"}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, listed) = send(app.clone(), "GET", "/servers?tag=research", None).await;
        assert_eq!(listed[0]["item"]["agent_id"], "research");

        send(app.clone(), "GET", "/agents/echoer", None).await;
        let (_, stats) = send(app.clone(), "GET", "/stats", None).await;
        assert_eq!(stats["agents"]["total_agents"], 1);
        assert_eq!(stats["agents"]["most_accessed"]["id"], "echoer");
        assert_eq!(stats["servers"]["total_agents"], 1);

        let (status, _) = send(app, "DELETE", "/cache", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.agents.is_empty());
        assert!(state.servers.is_empty());
    }
}
