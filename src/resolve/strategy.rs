//! 远端回复策略：直连分析服务、同源代理路由
//!
//! 每个策略返回 `Option<String>`，失败或空白正文记为 None，由 [`first_success`] 依次尝试。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::agents::AgentFamily;
use crate::chat::ChatContext;
use crate::proxy::upstream::{extract_text, post_json_with_retry, RetryPolicy};
use crate::proxy::{MurderChannel, MurderRequest, Proxies};

#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(
        &self,
        question: &str,
        agent_type: &str,
        context: Option<&ChatContext>,
    ) -> Option<String>;
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

/// 依次尝试，返回第一个非空结果
pub async fn first_success(
    strategies: &[Box<dyn ResolveStrategy>],
    question: &str,
    agent_type: &str,
    context: Option<&ChatContext>,
) -> Option<String> {
    for strategy in strategies {
        if let Some(text) = non_blank(strategy.attempt(question, agent_type, context).await) {
            tracing::debug!("Resolved {} via {}", agent_type, strategy.name());
            return Some(text);
        }
        tracing::debug!("Strategy {} missed for {}", strategy.name(), agent_type);
    }
    None
}

/// 直连罪案类型对应的分析服务（仅 murder / theft / finance 家族）
pub struct DirectBackend {
    proxies: Proxies,
}

impl DirectBackend {
    pub fn new(proxies: Proxies) -> Self {
        Self { proxies }
    }
}

#[async_trait]
impl ResolveStrategy for DirectBackend {
    fn name(&self) -> &'static str {
        "direct-backend"
    }

    async fn attempt(
        &self,
        question: &str,
        agent_type: &str,
        context: Option<&ChatContext>,
    ) -> Option<String> {
        let result = match AgentFamily::of(agent_type) {
            AgentFamily::Murder => {
                let request = MurderRequest::new(question)
                    .with_session(context.and_then(|c| c.session_id.clone()))
                    .with_context(context.cloned());
                self.proxies
                    .murder
                    .exchange(&request)
                    .await
                    .map(|reply| Some(reply.response))
            }
            AgentFamily::Theft => self.proxies.theft.ask(question, context).await,
            AgentFamily::Finance => self.proxies.finance.ask(question, context).await,
            _ => return None,
        };
        match result {
            Ok(text) => non_blank(text),
            Err(e) => {
                tracing::warn!("Direct backend for {} failed: {}", agent_type, e);
                None
            }
        }
    }
}

/// 同源代理路由 `{base_url}/<family>-agent/direct`，按 [api] 的超时与重试次数调用
pub struct ProxyRoute {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl ProxyRoute {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            retry: RetryPolicy::once(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl ResolveStrategy for ProxyRoute {
    fn name(&self) -> &'static str {
        "proxy-route"
    }

    async fn attempt(
        &self,
        question: &str,
        agent_type: &str,
        context: Option<&ChatContext>,
    ) -> Option<String> {
        let segment = AgentFamily::of(agent_type).proxy_segment()?;
        let url = format!("{}/{}/direct", self.base_url, segment);
        let body = json!({
            "question": question,
            "context": context,
            "sessionId": context.and_then(|c| c.session_id.as_deref()),
        });
        match post_json_with_retry(&self.client, &url, &body, self.timeout, self.retry).await {
            Ok(value) => non_blank(extract_text(&value)),
            Err(e) => {
                tracing::warn!("Proxy route {} failed: {}", url, e);
                None
            }
        }
    }
}
