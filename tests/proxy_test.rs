//! 代理路由与解析链对上游的行为（wiremock 模拟外部分析服务）

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use precinct::chat::ChatContext;
use precinct::config::AppConfig;
use precinct::proxy::murder::{murder_direct, ANALYSIS_TIMEOUT_MESSAGE, TIMEOUT_MESSAGE};
use precinct::proxy::{
    CaseBackend, CaseKind, DirectRequest, MurderBackend, MurderRequest, Proxies, Source,
};
use precinct::proxy::upstream::RetryPolicy;
use precinct::resolve::{DirectBackend, ProxyRoute, ResolveStrategy, ResponseCache, ResponseResolver};
use precinct::session::{CaseField, IntakeState};

fn config_for(server: &MockServer) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.backends.murder_url = format!("{}/murder", server.uri());
    cfg.backends.murder_reset_url = format!("{}/murder/reset", server.uri());
    cfg.backends.theft_url = format!("{}/theft", server.uri());
    cfg.backends.finance_url = format!("{}/finance", server.uri());
    cfg.proxy.timeout_secs = 2;
    cfg
}

fn request(question: &str) -> DirectRequest {
    DirectRequest {
        question: Some(question.to_string()),
        context: None,
    }
}

#[tokio::test]
async fn test_theft_success_passes_analysis_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/theft"))
        .and(body_partial_json(json!({"question": "what was stolen?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"analysis": "Two bicycles"})))
        .mount(&server)
        .await;

    let proxies = Proxies::from_config(&config_for(&server)).unwrap();
    let resp = proxies.theft.handle(&request("what was stolen?")).await;
    assert_eq!(resp.source, Source::DirectBackend);
    assert_eq!(resp.response, "Two bicycles");
}

#[tokio::test]
async fn test_theft_upstream_error_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/theft"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let proxies = Proxies::from_config(&config_for(&server)).unwrap();
    let resp = proxies.theft.handle(&request("any evidence?")).await;
    assert_eq!(resp.source, Source::Fallback);
    assert!(resp.response.starts_with("# Theft Case Analysis"));
    assert!(resp.response.contains("## Evidence Summary"));
}

#[tokio::test]
async fn test_finance_timeout_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/finance"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"analysis": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let backend = CaseBackend::new(
        CaseKind::Finance,
        reqwest::Client::new(),
        format!("{}/finance", server.uri()),
        Duration::from_millis(200),
    );
    let resp = backend.handle(&request("who did it?")).await;
    assert_eq!(resp.source, Source::Error);
    assert_eq!(
        resp.response,
        "The Financial Fraud Agent is taking too long to respond. Please try again later."
    );
}

#[tokio::test]
async fn test_murder_structured_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/murder"))
        .and(body_partial_json(json!({"session_id": "s-7", "question": "MC-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "session_id": "s-7",
            "data": {
                "analysis": "When did the crime occur?",
                "is_collecting_info": true,
                "current_step": "date_of_crime",
                "collected_data": {"case_id": "MC-1"}
            }
        })))
        .mount(&server)
        .await;

    let backend = MurderBackend::new(reqwest::Client::new(), &config_for(&server));
    let req = MurderRequest::new("MC-1").with_session(Some("s-7".into()));
    let resp = murder_direct(&backend, &req).await;
    assert_eq!(resp.source, Source::DirectBackend);
    assert_eq!(resp.session_id.as_deref(), Some("s-7"));
    assert_eq!(resp.current_step.as_deref(), Some("date_of_crime"));
    assert!(resp.is_collecting_info);
}

#[tokio::test]
async fn test_murder_timeout_depends_on_step() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/murder"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let backend = MurderBackend::new(reqwest::Client::new(), &config_for(&server))
        .with_timeout(Duration::from_millis(200));

    let mut ctx = ChatContext::murder_intake(true);
    ctx.current_step = Some(IntakeState::Collecting(CaseField::AdditionalNotes));
    let req = MurderRequest::new("nothing more")
        .with_session(Some("s-1".into()))
        .with_context(Some(ctx));
    let resp = murder_direct(&backend, &req).await;
    assert_eq!(resp.source, Source::Error);
    assert_eq!(resp.response, ANALYSIS_TIMEOUT_MESSAGE);
    assert_eq!(resp.current_step.as_deref(), Some("analysis_pending"));
    assert_eq!(resp.session_id.as_deref(), Some("s-1"));

    let resp = murder_direct(&backend, &MurderRequest::new("hello")).await;
    assert_eq!(resp.response, TIMEOUT_MESSAGE);
    assert_eq!(resp.session_id, None);
    assert!(!resp.is_collecting_info);
}

#[tokio::test]
async fn test_murder_failure_uses_local_analysis() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/murder"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let backend = MurderBackend::new(reqwest::Client::new(), &config_for(&server));
    let resp = murder_direct(&backend, &MurderRequest::new("what weapon was used?")).await;
    assert_eq!(resp.source, Source::Fallback);
    assert!(resp.response.starts_with("I'm unable to connect to the Murder Agent backend"));
}

#[tokio::test]
async fn test_murder_reset_and_check() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/murder/reset"))
        .and(body_partial_json(json!({"session_id": "old"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"session_id": "new-1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/murder"))
        .and(body_partial_json(json!({"question": "ping"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "pong"})))
        .mount(&server)
        .await;

    let backend = MurderBackend::new(reqwest::Client::new(), &config_for(&server));
    assert_eq!(backend.reset_session("old").await.unwrap().as_deref(), Some("new-1"));
    assert!(backend.check().await);
}

#[tokio::test]
async fn test_resolver_prefers_backend_then_caches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/theft"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "Remote theft view"})))
        .expect(1)
        .mount(&server)
        .await;

    let proxies = Proxies::from_config(&config_for(&server)).unwrap();
    let cache = Arc::new(ResponseCache::new(Duration::from_secs(300)));
    let resolver = ResponseResolver::new(cache.clone())
        .with_strategy(Box::new(DirectBackend::new(proxies)))
        .with_budget(Duration::from_secs(5));

    assert_eq!(resolver.resolve("status?", "theft", None).await, "Remote theft view");
    assert_eq!(resolver.resolve("status?", "theft", None).await, "Remote theft view");
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_resolver_degrades_when_everything_fails() {
    let mut cfg = AppConfig::default();
    cfg.backends.finance_url = "http://127.0.0.1:1/finance".to_string();
    let proxies = Proxies::from_config(&cfg).unwrap();
    let resolver = ResponseResolver::new(Arc::new(ResponseCache::new(Duration::from_secs(300))))
        .with_strategy(Box::new(DirectBackend::new(proxies)))
        .with_budget(Duration::from_secs(5));

    let text = resolver
        .resolve("Where did the financial fraud happen?", "finance", None)
        .await;
    assert!(text.contains("XYZ Corp"));
}

#[tokio::test]
async fn test_proxy_route_retries_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/theft-agent/direct"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/theft-agent/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "Second try"})))
        .mount(&server)
        .await;

    let route = ProxyRoute::new(reqwest::Client::new(), format!("{}/api", server.uri()), Duration::from_secs(2))
        .with_retry(RetryPolicy::new(3, Duration::from_millis(10)));
    let text = route.attempt("what was stolen?", "theft", None).await;
    assert_eq!(text.as_deref(), Some("Second try"));
}

#[tokio::test]
async fn test_proxy_route_gives_up_on_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/financial-fraud-agent/direct"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let route = ProxyRoute::new(reqwest::Client::new(), format!("{}/api", server.uri()), Duration::from_secs(2))
        .with_retry(RetryPolicy::new(3, Duration::from_millis(10)));
    assert_eq!(route.attempt("who?", "finance", None).await, None);
}

#[tokio::test]
async fn test_proxy_route_stops_after_configured_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/murder-agent/direct"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let route = ProxyRoute::new(reqwest::Client::new(), format!("{}/api", server.uri()), Duration::from_secs(2))
        .with_retry(RetryPolicy::new(2, Duration::from_millis(10)));
    assert_eq!(route.attempt("who?", "murder", None).await, None);
}
