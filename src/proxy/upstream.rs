//! 外部分析服务调用：POST JSON，整体受超时约束，超时即取消请求

use std::time::Duration;

use serde_json::Value;

use crate::core::error::{PrecinctError, Result};

/// 发送 JSON 并解析 JSON 响应；非 2xx、超时、响应体不是 JSON 都返回错误
pub async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
    timeout: Duration,
) -> Result<Value> {
    let call = async {
        let resp = client.post(url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PrecinctError::UpstreamStatus(status.as_u16()));
        }
        let text = resp.text().await?;
        serde_json::from_str::<Value>(&text)
            .map_err(|e| PrecinctError::MalformedUpstream(e.to_string()))
    };

    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(PrecinctError::Timeout(timeout.as_millis() as u64)),
    }
}

/// 同源 API 的重试策略：失败后按 `base_delay * 2^n` 退避，4xx 直接返回
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    /// 只发一次
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn backoff(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// [`post_json`] 加重试；每次调用各自受 `timeout` 约束
pub async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
    timeout: Duration,
    policy: RetryPolicy,
) -> Result<Value> {
    let mut attempt = 1;
    loop {
        match post_json(client, url, body, timeout).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_client_error() || attempt >= policy.attempts => return Err(e),
            Err(e) => {
                let delay = policy.backoff(attempt - 1);
                tracing::debug!(
                    "Retry {}/{} for {} in {:?}: {}",
                    attempt + 1,
                    policy.attempts,
                    url,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// 探活：POST 一个 ping 请求体，在限定时间内返回 2xx 即视为可用
pub async fn probe(client: &reqwest::Client, url: &str, body: &Value, timeout: Duration) -> bool {
    let call = client.post(url).json(body).send();
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(resp)) => resp.status().is_success(),
        Ok(Err(e)) => {
            tracing::debug!("Probe {} failed: {}", url, e);
            false
        }
        Err(_) => false,
    }
}

fn non_blank(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// 从上游响应中取出正文：data.analysis、response、analysis、message、data.response、data.message
pub fn extract_text(body: &Value) -> Option<String> {
    let data = body.get("data");
    non_blank(data.and_then(|d| d.get("analysis")))
        .or_else(|| non_blank(body.get("response")))
        .or_else(|| non_blank(body.get("analysis")))
        .or_else(|| non_blank(body.get("message")))
        .or_else(|| non_blank(data.and_then(|d| d.get("response"))))
        .or_else(|| non_blank(data.and_then(|d| d.get("message"))))
}
