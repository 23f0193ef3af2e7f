//! HTTP 接口：代理路由、智能体列表与启用状态、推荐问题、对话
//!
//! 代理与对话接口的请求体按字符串读取后宽松解析，格式错误同样以 200 返回带 error 字段的 JSON。

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::agents::suggested::lookup;
use crate::agents::{AgentRegistry, AgentStatusStore};
use crate::chat::{ChatContext, ChatOrchestrator, KeyValueStore};
use crate::config::AppConfig;
use crate::core::error::Result;
use crate::proxy::murder::{murder_direct, MurderRequest};
use crate::proxy::{CaseBackend, DirectRequest, DirectResponse, MurderDirectResponse, Proxies, Source};

/// 各接口共享的状态
pub struct AppState {
    pub registry: Arc<AgentRegistry>,
    pub status: Arc<AgentStatusStore>,
    pub proxies: Proxies,
    pub chat: Arc<ChatOrchestrator>,
}

impl AppState {
    pub fn new(
        registry: Arc<AgentRegistry>,
        status: Arc<AgentStatusStore>,
        proxies: Proxies,
        chat: Arc<ChatOrchestrator>,
    ) -> Self {
        Self {
            registry,
            status,
            proxies,
            chat,
        }
    }

    pub fn from_config(config: &AppConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let registry = Arc::new(AgentRegistry::from_agents(config.agents.clone()));
        let status = Arc::new(AgentStatusStore::new(&registry, &config.enabled_agents));
        let proxies = Proxies::from_config(config)?;
        let chat = Arc::new(ChatOrchestrator::from_config(config, storage)?);
        Ok(Self::new(registry, status, proxies, chat))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/murder-agent", post(murder_local))
        .route("/api/murder-agent/direct", post(murder_direct_route))
        .route("/api/murder-agent/reset", post(murder_reset))
        .route("/api/murder-agent/check", get(murder_check))
        .route("/api/theft-agent/direct", post(theft_direct))
        .route("/api/financial-fraud-agent/direct", post(finance_direct))
        .route("/api/agents", get(agents_list))
        .route(
            "/api/agents/status",
            get(status_get).put(status_put).patch(status_patch),
        )
        .route("/api/augment/suggested-questions", get(suggested))
        .route("/api/chat/send", post(chat_send))
        .route("/api/chat/messages", get(chat_messages))
        .route("/api/chat/clear", post(chat_clear))
        .route("/api/chat/agent", post(chat_agent))
        .route("/api/chat/murder/reset", post(chat_murder_reset))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(state)
}

fn parse<T: for<'de> Deserialize<'de>>(body: &str) -> std::result::Result<T, String> {
    serde_json::from_str(body).map_err(|e| format!("Invalid JSON body: {}", e))
}

fn missing_question() -> Response {
    Json(json!({ "error": "Missing required field: question" })).into_response()
}

async fn murder_local(State(state): State<Arc<AppState>>, body: String) -> Response {
    let request: DirectRequest = match parse(&body) {
        Ok(r) => r,
        Err(e) => return Json(json!({ "error": e })).into_response(),
    };
    let question = match request.question.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return missing_question(),
    };
    let response = state
        .proxies
        .murder
        .local_analysis(&question, request.context.as_ref());
    Json(json!({ "response": response })).into_response()
}

async fn murder_direct_route(State(state): State<Arc<AppState>>, body: String) -> Json<MurderDirectResponse> {
    match parse::<MurderRequest>(&body) {
        Ok(request) => Json(murder_direct(&state.proxies.murder, &request).await),
        Err(e) => Json(MurderDirectResponse {
            response: format!(
                "I'm sorry, but there was an error processing your request: {}. Please try again.",
                e
            ),
            source: Source::Error,
            session_id: None,
            is_collecting_info: false,
            current_step: None,
            collected_data: None,
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ResetRequest {
    session_id: Option<String>,
}

const RESET_FAILED: &str = "Failed to reset Murder Agent session";

async fn murder_reset(State(state): State<Arc<AppState>>, body: String) -> Json<Value> {
    let request: ResetRequest = match parse(&body) {
        Ok(r) => r,
        Err(e) => return Json(json!({ "success": false, "error": e, "message": RESET_FAILED })),
    };
    let Some(session_id) = request.session_id.filter(|s| !s.trim().is_empty()) else {
        return Json(json!({
            "success": false,
            "error": "Missing required field: sessionId",
            "message": RESET_FAILED
        }));
    };

    match state.proxies.murder.reset_session(&session_id).await {
        Ok(new_session) => Json(json!({
            "success": true,
            "sessionId": new_session,
            "message": "Murder Agent session reset successfully"
        })),
        Err(e) => {
            tracing::warn!("Murder session reset failed: {}", e);
            let error = if e.is_timeout() {
                "Connection to the Murder Agent backend timed out".to_string()
            } else {
                e.to_string()
            };
            Json(json!({ "success": false, "error": error, "message": RESET_FAILED }))
        }
    }
}

async fn murder_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let available = state.proxies.murder.check().await;
    let message = if available {
        "Murder Agent backend is available"
    } else {
        "Murder Agent backend is not available"
    };
    Json(json!({ "available": available, "message": message }))
}

async fn case_direct(backend: &CaseBackend, body: &str) -> Json<DirectResponse> {
    match parse::<DirectRequest>(body) {
        Ok(request) => Json(backend.handle(&request).await),
        Err(e) => Json(DirectResponse::invalid(
            e,
            "Sorry, there was an error processing your request. Please try again later.",
        )),
    }
}

async fn theft_direct(State(state): State<Arc<AppState>>, body: String) -> Json<DirectResponse> {
    case_direct(&state.proxies.theft, &body).await
}

async fn finance_direct(State(state): State<Arc<AppState>>, body: String) -> Json<DirectResponse> {
    case_direct(&state.proxies.finance, &body).await
}

async fn agents_list(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.registry.all()))
}

async fn status_get(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.status.snapshot().await))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdate {
    agent_id: String,
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct StatusBatch {
    agents: HashMap<String, bool>,
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

async fn status_put(State(state): State<Arc<AppState>>, body: String) -> Response {
    let Ok(update) = parse::<StatusUpdate>(&body) else {
        return bad_request("Invalid request. Required fields: agentId, enabled");
    };
    state.status.set(&update.agent_id, update.enabled).await;
    Json(json!({
        "agentId": update.agent_id,
        "enabled": update.enabled,
        "message": format!(
            "Agent {} {} successfully",
            update.agent_id,
            if update.enabled { "enabled" } else { "disabled" }
        )
    }))
    .into_response()
}

async fn status_patch(State(state): State<Arc<AppState>>, body: String) -> Response {
    let Ok(batch) = parse::<StatusBatch>(&body) else {
        return bad_request("Invalid request. Required field: agents (object)");
    };
    let agents = state.status.merge(batch.agents).await;
    Json(json!({ "agents": agents, "message": "Agent statuses updated successfully" })).into_response()
}

async fn suggested(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let agent_type = params.get("agentType").map(String::as_str);
    let (questions, found) = lookup(agent_type);
    let message = match agent_type {
        Some(t) if found => format!("Suggested questions for {} agent retrieved successfully", t),
        _ => "Default suggested questions retrieved successfully".to_string(),
    };
    Json(json!({ "success": true, "data": questions, "message": message }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SendRequest {
    content: String,
}

async fn chat_send(State(state): State<Arc<AppState>>, body: String) -> Json<Value> {
    match parse::<SendRequest>(&body) {
        Ok(request) => {
            let added = state.chat.send(&request.content).await;
            Json(json!({ "messages": added }))
        }
        Err(e) => Json(json!({ "messages": [], "error": e })),
    }
}

async fn chat_messages(State(state): State<Arc<AppState>>) -> Json<Value> {
    let chat = &state.chat;
    Json(json!({
        "messages": chat.messages().await,
        "isTyping": chat.is_typing().await,
        "currentAgent": chat.current_agent().await,
        "selectedAgents": chat.selected_agents().await,
    }))
}

async fn chat_clear(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.chat.clear().await;
    Json(json!({ "success": true }))
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum AgentAction {
    #[default]
    Current,
    Select,
    Deselect,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentRequest {
    agent_id: String,
    #[serde(default)]
    action: AgentAction,
    #[serde(default)]
    context: Option<ChatContext>,
}

async fn chat_agent(State(state): State<Arc<AppState>>, body: String) -> Json<Value> {
    let request: AgentRequest = match parse(&body) {
        Ok(r) => r,
        Err(e) => return Json(json!({ "changed": false, "error": e })),
    };
    let chat = &state.chat;
    if request.action != AgentAction::Deselect && !state.status.is_enabled(&request.agent_id).await {
        tracing::warn!("Rejected disabled agent {}", request.agent_id);
        return Json(json!({
            "changed": false,
            "error": format!("Agent {} is disabled", request.agent_id),
            "currentAgent": chat.current_agent().await,
            "selectedAgents": chat.selected_agents().await,
        }));
    }
    let changed = match request.action {
        AgentAction::Current => {
            chat.set_current_agent(&request.agent_id, request.context).await;
            true
        }
        AgentAction::Select => chat.select_agent(&request.agent_id).await,
        AgentAction::Deselect => chat.deselect_agent(&request.agent_id).await,
    };
    Json(json!({
        "changed": changed,
        "currentAgent": chat.current_agent().await,
        "selectedAgents": chat.selected_agents().await,
    }))
}

async fn chat_murder_reset(State(state): State<Arc<AppState>>) -> Json<Value> {
    let greeting = state.chat.reset_murder_session().await;
    Json(json!({
        "message": greeting,
        "sessionId": state.chat.murder_session().await,
    }))
}
