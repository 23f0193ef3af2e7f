//! HTTP 接口：代理路由对任何合法 JSON 都返回 200

#![cfg(feature = "web")]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use precinct::agents::{AgentRegistry, AgentStatusStore};
use precinct::chat::{ChatOrchestrator, MemoryStore};
use precinct::config::AppConfig;
use precinct::proxy::Proxies;
use precinct::resolve::{ResponseCache, ResponseResolver};
use precinct::server::{router, AppState};
use precinct::session::IntakeFlow;

/// 所有外部服务都指向不可达端口
fn app() -> axum::Router {
    app_with("http://127.0.0.1:1")
}

fn app_with(upstream: &str) -> axum::Router {
    let mut cfg = AppConfig::default();
    cfg.backends.murder_url = format!("{}/murder", upstream);
    cfg.backends.murder_reset_url = format!("{}/murder/reset", upstream);
    cfg.backends.theft_url = format!("{}/theft", upstream);
    cfg.backends.finance_url = format!("{}/finance", upstream);
    cfg.proxy.timeout_secs = 2;

    let registry = Arc::new(AgentRegistry::default());
    let status = Arc::new(AgentStatusStore::new(&registry, &cfg.enabled_agents));
    let proxies = Proxies::from_config(&cfg).unwrap();
    let resolver = ResponseResolver::new(Arc::new(ResponseCache::new(Duration::from_secs(300))));
    let chat = ChatOrchestrator::new(
        Arc::new(resolver),
        IntakeFlow::local(),
        Arc::new(MemoryStore::new()),
    )
    .with_delays(Duration::ZERO, Duration::ZERO);

    router(Arc::new(AppState::new(registry, status, proxies, Arc::new(chat))))
}

async fn call(app: axum::Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_proxy_routes_always_answer_200() {
    let cases = [
        ("/api/theft-agent/direct", r#"{"question": "what was stolen?"}"#),
        ("/api/theft-agent/direct", r#"{"question": ""}"#),
        ("/api/financial-fraud-agent/direct", r#"{"question": "show the money trail"}"#),
        ("/api/financial-fraud-agent/direct", r#"{}"#),
        ("/api/murder-agent/direct", r#"{"question": "who is the suspect?"}"#),
        ("/api/murder-agent/direct", r#"{"question": "FORCE_NEW_SESSION", "forceReset": true}"#),
        ("/api/murder-agent/direct", r#"{}"#),
        ("/api/murder-agent", r#"{"question": "evidence?"}"#),
        ("/api/murder-agent/reset", r#"{"sessionId": "s-1"}"#),
    ];
    for (uri, body) in cases {
        let (status, value) = call(app(), "POST", uri, body).await;
        assert_eq!(status, StatusCode::OK, "{uri} {body}");
        assert!(
            value.get("response").is_some() || value.get("error").is_some(),
            "{uri} {body}: {value}"
        );
    }
}

#[tokio::test]
async fn test_malformed_json_is_still_200() {
    let (status, value) = call(app(), "POST", "/api/theft-agent/direct", "{oops").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["source"], "error");
    assert!(value["error"].as_str().unwrap().starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn test_unreachable_finance_falls_back() {
    let (_, value) = call(
        app(),
        "POST",
        "/api/financial-fraud-agent/direct",
        r#"{"question": "any proof?", "context": {"financialInstitution": "First Bank"}}"#,
    )
    .await;
    assert_eq!(value["source"], "fallback");
    assert!(value["response"]
        .as_str()
        .unwrap()
        .contains("Digital transaction records from First Bank"));
}

#[tokio::test]
async fn test_murder_check_reports_unavailable() {
    let (status, value) = call(app(), "GET", "/api/murder-agent/check", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["available"], false);
}

#[tokio::test]
async fn test_agent_status_roundtrip() {
    let app = app();
    let (_, value) = call(app.clone(), "GET", "/api/agents/status", "").await;
    assert_eq!(value["murder"], false);

    let (status, value) = call(
        app.clone(),
        "PUT",
        "/api/agents/status",
        r#"{"agentId": "murder", "enabled": true}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["message"], "Agent murder enabled successfully");

    let (_, value) = call(
        app.clone(),
        "PATCH",
        "/api/agents/status",
        &json!({"agents": {"theft": true}}).to_string(),
    )
    .await;
    assert_eq!(value["agents"]["murder"], true);
    assert_eq!(value["agents"]["theft"], true);

    let (status, _) = call(app, "PUT", "/api/agents/status", r#"{"enabled": true}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_suggested_questions_default_to_general() {
    let (_, murder) = call(
        app(),
        "GET",
        "/api/augment/suggested-questions?agentType=murder",
        "",
    )
    .await;
    let (_, unknown) = call(
        app(),
        "GET",
        "/api/augment/suggested-questions?agentType=nope",
        "",
    )
    .await;
    let (_, general) = call(app(), "GET", "/api/augment/suggested-questions", "").await;
    assert_eq!(murder["success"], true);
    assert_ne!(murder["data"], general["data"]);
    assert_eq!(unknown["data"], general["data"]);
}

#[tokio::test]
async fn test_chat_endpoints() {
    let app = app();
    let (_, sent) = call(
        app.clone(),
        "POST",
        "/api/chat/send",
        r#"{"content": "How many active cases?"}"#,
    )
    .await;
    assert_eq!(sent["messages"].as_array().unwrap().len(), 2);

    let (_, log) = call(app.clone(), "GET", "/api/chat/messages", "").await;
    assert_eq!(log["messages"].as_array().unwrap().len(), 2);
    assert_eq!(log["currentAgent"], "general");
    assert_eq!(log["isTyping"], false);

    let (_, cleared) = call(app.clone(), "POST", "/api/chat/clear", "").await;
    assert_eq!(cleared["success"], true);
    let (_, log) = call(app, "GET", "/api/chat/messages", "").await;
    assert!(log["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_agent_listing_and_health() {
    let (_, agents) = call(app(), "GET", "/api/agents", "").await;
    assert_eq!(agents.as_array().unwrap().len(), 14);

    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_html_from_upstream_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let cases = [
        ("/api/theft-agent/direct", "# Theft Case Analysis"),
        ("/api/financial-fraud-agent/direct", "# Financial Fraud Analysis"),
        ("/api/murder-agent/direct", "I'm unable to connect to the Murder Agent backend"),
    ];
    for (uri, prefix) in cases {
        let (status, value) = call(
            app_with(&server.uri()),
            "POST",
            uri,
            r#"{"question": "what happened?", "sessionId": "s-1"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(value["source"], "fallback", "{uri}: {value}");
        assert!(value["response"].as_str().unwrap().starts_with(prefix), "{uri}: {value}");
    }
}

#[tokio::test]
async fn test_disabled_agent_cannot_be_selected() {
    let app = app();
    let (_, value) = call(
        app.clone(),
        "POST",
        "/api/chat/agent",
        r#"{"agentId": "murder", "action": "select"}"#,
    )
    .await;
    assert_eq!(value["changed"], false);
    assert_eq!(value["error"], "Agent murder is disabled");
    assert_eq!(value["selectedAgents"], json!(["general"]));

    call(
        app.clone(),
        "PUT",
        "/api/agents/status",
        r#"{"agentId": "murder", "enabled": true}"#,
    )
    .await;
    let (_, value) = call(
        app,
        "POST",
        "/api/chat/agent",
        r#"{"agentId": "murder", "action": "select"}"#,
    )
    .await;
    assert_eq!(value["changed"], true);
    assert!(value.get("error").is_none());
    assert_eq!(value["selectedAgents"], json!(["general", "murder"]));
}
