//! 凶案分析服务：请求/回复类型、远端客户端与代理路由逻辑

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::fallback;
use super::payload::{is_analysis_step, murder_payload};
use super::upstream::{extract_text, post_json, probe};
use super::Source;
use crate::chat::message::string_map;
use crate::chat::ChatContext;
use crate::config::AppConfig;
use crate::core::error::{PrecinctError, Result};
use crate::session::intake::CaseField;

pub const ANALYSIS_TIMEOUT_MESSAGE: &str = "I'm generating a detailed analysis of your case, but it's taking longer than expected. This is normal for complex cases. Please try sending 'continue' or 'analyze' to complete the analysis.";
pub const TIMEOUT_MESSAGE: &str = "I'm sorry, but the connection to the Murder Agent backend timed out. Please try again later or check if the backend service is running.";

/// 发往凶案服务的一轮对话（也是 `/api/murder-agent/direct` 的请求体）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MurderRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ChatContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub force_reset: bool,
}

impl MurderRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: Option<ChatContext>) -> Self {
        self.context = context;
        self
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn force_reset(mut self) -> Self {
        self.force_reset = true;
        self
    }

    pub fn payload(&self) -> Value {
        murder_payload(
            &self.question,
            self.context.as_ref(),
            self.session_id.as_deref(),
            self.force_reset,
        )
    }
}

/// 凶案服务的回复
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MurderReply {
    pub response: String,
    pub session_id: Option<String>,
    pub is_collecting_info: bool,
    /// 仅结构化回复（data.analysis）携带
    pub current_step: Option<String>,
    pub collected_data: BTreeMap<String, String>,
}

/// 解析上游响应：优先结构化的 data.analysis，其次任何可用的文本字段
pub fn parse_reply(body: &Value) -> Result<MurderReply> {
    let session_id = body
        .get("session_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let data = body.get("data");

    let analysis = data
        .and_then(|d| d.get("analysis"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty());
    if let Some(analysis) = analysis {
        return Ok(MurderReply {
            response: analysis.to_string(),
            session_id,
            is_collecting_info: data
                .and_then(|d| d.get("is_collecting_info"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            current_step: data
                .and_then(|d| d.get("current_step"))
                .and_then(Value::as_str)
                .map(str::to_string),
            collected_data: string_map(data.and_then(|d| d.get("collected_data"))),
        });
    }

    match extract_text(body) {
        Some(text) => Ok(MurderReply {
            response: text,
            session_id,
            is_collecting_info: true,
            current_step: None,
            collected_data: BTreeMap::new(),
        }),
        None => Err(PrecinctError::MalformedUpstream(
            "no analysis, response or message in murder reply".to_string(),
        )),
    }
}

/// 与凶案服务的一轮往返
#[async_trait]
pub trait MurderChannel: Send + Sync {
    async fn exchange(&self, request: &MurderRequest) -> Result<MurderReply>;
}

/// 凶案服务 HTTP 客户端
#[derive(Debug, Clone)]
pub struct MurderBackend {
    client: reqwest::Client,
    url: String,
    reset_url: String,
    timeout: Duration,
    reset_timeout: Duration,
    check_timeout: Duration,
    use_mock: bool,
}

impl MurderBackend {
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            url: config.backends.murder_url.clone(),
            reset_url: config.backends.murder_reset_url.clone(),
            timeout: Duration::from_secs(config.proxy.timeout_secs),
            reset_timeout: Duration::from_secs(config.proxy.reset_timeout_secs),
            check_timeout: Duration::from_secs(config.proxy.check_timeout_secs),
            use_mock: config.proxy.use_mock_murder_agent,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn post(&self, payload: &Value) -> Result<MurderReply> {
        tracing::debug!("Murder backend request: {}", payload);
        let body = post_json(&self.client, &self.url, payload, self.timeout).await?;
        parse_reply(&body)
    }

    /// 通知服务端丢弃会话，返回服务端新发的会话 id
    pub async fn reset_session(&self, session_id: &str) -> Result<Option<String>> {
        let body = post_json(
            &self.client,
            &self.reset_url,
            &json!({ "session_id": session_id }),
            self.reset_timeout,
        )
        .await?;
        Ok(body
            .get("session_id")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub async fn check(&self) -> bool {
        let ping = json!({
            "question": "ping",
            "additional_notes": "This is a ping to check if the Murder Agent API is running."
        });
        probe(&self.client, &self.url, &ping, self.check_timeout).await
    }

    /// `/api/murder-agent` 的本地分析
    pub fn local_analysis(&self, question: &str, context: Option<&ChatContext>) -> String {
        local_analysis(question, context, self.use_mock)
    }
}

#[async_trait]
impl MurderChannel for MurderBackend {
    async fn exchange(&self, request: &MurderRequest) -> Result<MurderReply> {
        self.post(&request.payload()).await
    }
}

/// 上下文中已知的案件字段
pub fn case_data(context: &ChatContext) -> BTreeMap<String, String> {
    let mut data: BTreeMap<String, String> = CaseField::ALL
        .iter()
        .filter_map(|f| context.field(f.key()).map(|v| (f.key().to_string(), v.to_string())))
        .collect();
    for (k, v) in &context.collected_data {
        data.entry(k.clone()).or_insert_with(|| v.clone());
    }
    data
}

/// 本地凶案分析：Mock 模式用 Mock 模板；有案件资料时生成完整报告；否则给出通用指引
pub fn local_analysis(question: &str, context: Option<&ChatContext>, use_mock: bool) -> String {
    if use_mock {
        return fallback::murder_mock_analysis(question, context);
    }
    match context.map(case_data).filter(|d| !d.is_empty()) {
        Some(data) => fallback::murder_case_analysis(&data),
        None => fallback::murder_unavailable(question, context),
    }
}

/// `/api/murder-agent/direct` 的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MurderDirectResponse {
    pub response: String,
    pub source: Source,
    pub session_id: Option<String>,
    pub is_collecting_info: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collected_data: Option<BTreeMap<String, String>>,
}

/// 转发到凶案服务；超时与失败均降级为可展示的回复
pub async fn murder_direct(backend: &MurderBackend, request: &MurderRequest) -> MurderDirectResponse {
    let payload = request.payload();

    match backend.post(&payload).await {
        Ok(reply) => MurderDirectResponse {
            response: reply.response,
            source: Source::DirectBackend,
            session_id: reply.session_id,
            is_collecting_info: reply.is_collecting_info,
            current_step: reply.current_step,
            collected_data: Some(reply.collected_data),
        },
        Err(e) if e.is_timeout() => {
            tracing::warn!("Murder backend timed out: {}", e);
            if is_analysis_step(&payload) {
                MurderDirectResponse {
                    response: ANALYSIS_TIMEOUT_MESSAGE.to_string(),
                    source: Source::Error,
                    session_id: payload
                        .get("session_id")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    is_collecting_info: true,
                    current_step: Some("analysis_pending".to_string()),
                    collected_data: None,
                }
            } else {
                MurderDirectResponse {
                    response: TIMEOUT_MESSAGE.to_string(),
                    source: Source::Error,
                    session_id: None,
                    is_collecting_info: false,
                    current_step: None,
                    collected_data: None,
                }
            }
        }
        Err(e) => {
            tracing::warn!("Murder backend failed, using local analysis: {}", e);
            MurderDirectResponse {
                response: backend.local_analysis(&request.question, request.context.as_ref()),
                source: Source::Fallback,
                session_id: None,
                is_collecting_info: false,
                current_step: None,
                collected_data: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structured_reply() {
        let body = json!({
            "success": true,
            "session_id": "s-42",
            "data": {
                "analysis": "What is the date?",
                "is_collecting_info": true,
                "current_step": "date_of_crime",
                "collected_data": {"case_id": "MC-1", "victim_age": 30}
            }
        });
        let reply = parse_reply(&body).unwrap();
        assert_eq!(reply.session_id.as_deref(), Some("s-42"));
        assert_eq!(reply.current_step.as_deref(), Some("date_of_crime"));
        assert_eq!(reply.collected_data.get("victim_age").map(String::as_str), Some("30"));
    }

    #[test]
    fn test_parse_message_reply() {
        let reply = parse_reply(&json!({"success": true, "message": "Hello"})).unwrap();
        assert_eq!(reply.response, "Hello");
        assert!(reply.is_collecting_info);
        assert_eq!(reply.current_step, None);
    }

    #[test]
    fn test_parse_empty_reply_fails() {
        let err = parse_reply(&json!({"success": false})).unwrap_err();
        assert!(matches!(err, PrecinctError::MalformedUpstream(_)));
    }

    #[test]
    fn test_request_from_wire() {
        let req: MurderRequest = serde_json::from_value(json!({
            "question": "hi",
            "sessionId": "new session",
            "forceReset": true
        }))
        .unwrap();
        assert!(req.force_reset);
        assert_eq!(req.payload()["session_id"], Value::Null);

        let req: MurderRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req.payload()["question"], "initialize");
    }

    #[test]
    fn test_local_analysis_choice() {
        let ctx = ChatContext {
            victim_name: Some("Jane".into()),
            ..Default::default()
        };
        assert!(local_analysis("q", Some(&ctx), false).starts_with("# MURDER CASE ANALYSIS"));
        assert!(local_analysis("q", None, false).starts_with("I'm unable to connect"));
        assert!(local_analysis("q", Some(&ctx), true).starts_with("# Murder Case Analysis"));
    }
}
