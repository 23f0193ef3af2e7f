//! 盗窃与金融诈骗分析服务的代理路由

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fallback;
use super::payload::{finance_payload, theft_payload};
use super::upstream::{extract_text, post_json};
use super::Source;
use crate::chat::ChatContext;
use crate::core::error::Result;

/// 有独立代理路由的罪案类型（凶案除外）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    Theft,
    Finance,
}

impl CaseKind {
    pub fn agent_name(self) -> &'static str {
        match self {
            CaseKind::Theft => "Theft Agent",
            CaseKind::Finance => "Financial Fraud Agent",
        }
    }

    pub fn payload(self, question: &str, context: Option<&ChatContext>) -> Value {
        match self {
            CaseKind::Theft => theft_payload(question, context),
            CaseKind::Finance => finance_payload(question, context),
        }
    }

    pub fn local_analysis(self, question: &str, context: Option<&ChatContext>) -> String {
        match self {
            CaseKind::Theft => fallback::theft_analysis(question, context),
            CaseKind::Finance => fallback::finance_analysis(question, context),
        }
    }

    fn timeout_message(self) -> String {
        format!(
            "The {} is taking too long to respond. Please try again later.",
            self.agent_name()
        )
    }
}

/// 代理路由请求体：`{question, context}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectRequest {
    pub question: Option<String>,
    pub context: Option<ChatContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectResponse {
    pub response: String,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DirectResponse {
    pub fn invalid(message: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            source: Source::Error,
            error: Some(message.into()),
        }
    }
}

/// 单个罪案类型的远端服务
#[derive(Debug, Clone)]
pub struct CaseBackend {
    kind: CaseKind,
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl CaseBackend {
    pub fn new(kind: CaseKind, client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            kind,
            client,
            url: url.into(),
            timeout,
        }
    }

    /// 远端调用；响应中没有正文时返回 None
    pub async fn ask(&self, question: &str, context: Option<&ChatContext>) -> Result<Option<String>> {
        let payload = self.kind.payload(question, context);
        tracing::debug!("{} request: {}", self.kind.agent_name(), payload);
        let body = post_json(&self.client, &self.url, &payload, self.timeout).await?;
        Ok(extract_text(&body))
    }

    /// 代理路由：远端成功、超时、失败三种结果都返回可展示的回复
    pub async fn handle(&self, request: &DirectRequest) -> DirectResponse {
        let question = match request.question.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q,
            _ => {
                return DirectResponse::invalid(
                    "Missing required field: question",
                    format!("Please provide a question for the {}.", self.kind.agent_name()),
                )
            }
        };
        let context = request.context.as_ref();

        match self.ask(question, context).await {
            Ok(text) => DirectResponse {
                response: text
                    .unwrap_or_else(|| format!("No response from {}", self.kind.agent_name())),
                source: Source::DirectBackend,
                error: None,
            },
            Err(e) if e.is_timeout() => {
                tracing::warn!("{} timed out: {}", self.kind.agent_name(), e);
                DirectResponse {
                    response: self.kind.timeout_message(),
                    source: Source::Error,
                    error: Some(e.to_string()),
                }
            }
            Err(e) => {
                tracing::warn!("{} failed, using local analysis: {}", self.kind.agent_name(), e);
                DirectResponse {
                    response: self.kind.local_analysis(question, context),
                    source: Source::Fallback,
                    error: None,
                }
            }
        }
    }
}
