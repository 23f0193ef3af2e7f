//! 回复解析：缓存 → 远端策略链 → 本地模板
//!
//! `resolve` 从不返回错误：远端全部失败或超出时间预算时由本地模板兜底，结果写回缓存。

pub mod cache;
pub mod strategy;
pub mod templates;

use std::sync::Arc;
use std::time::Duration;

use crate::chat::ChatContext;
use crate::config::AppConfig;
use crate::core::error::Result;
use crate::proxy::{http_client, Proxies};

pub use cache::ResponseCache;
pub use strategy::{first_success, DirectBackend, ProxyRoute, ResolveStrategy};

/// 本地生成器：(agent_type, question, context) -> 文本
pub type FallbackGenerator = Arc<dyn Fn(&str, &str, Option<&ChatContext>) -> String + Send + Sync>;

pub fn default_fallback() -> FallbackGenerator {
    Arc::new(templates::generate)
}

pub struct ResponseResolver {
    cache: Arc<ResponseCache>,
    strategies: Vec<Box<dyn ResolveStrategy>>,
    fallback: FallbackGenerator,
    budget: Duration,
    remote_enabled: bool,
}

impl ResponseResolver {
    /// 仅本地模板
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self {
            cache,
            strategies: Vec::new(),
            fallback: default_fallback(),
            budget: Duration::from_secs(15),
            remote_enabled: false,
        }
    }

    /// 追加一个远端策略并启用远端解析
    pub fn with_strategy(mut self, strategy: Box<dyn ResolveStrategy>) -> Self {
        self.strategies.push(strategy);
        self.remote_enabled = true;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackGenerator) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// augment 关闭或 Mock 模式时不挂远端策略
    pub fn from_config(config: &AppConfig, cache: Arc<ResponseCache>) -> Result<Self> {
        let budget = config.augment.request_timeout();
        let mut resolver = Self::new(cache).with_budget(budget);
        if config.remote_enabled() {
            let proxies = Proxies::from_config(config)?;
            resolver = resolver
                .with_strategy(Box::new(DirectBackend::new(proxies)))
                .with_strategy(Box::new(
                    ProxyRoute::new(
                        http_client(config)?,
                        config.api.base_url.clone(),
                        config.api.timeout(),
                    )
                    .with_retry(config.api.retry_policy()),
                ));
        }
        tracing::info!(
            "Response resolver ready (remote: {}, budget: {:?})",
            resolver.remote_enabled,
            resolver.budget
        );
        Ok(resolver)
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn local(&self, agent_type: &str, question: &str, context: Option<&ChatContext>) -> String {
        (self.fallback)(agent_type, question, context)
    }

    pub async fn resolve(
        &self,
        question: &str,
        agent_type: &str,
        context: Option<&ChatContext>,
    ) -> String {
        if let Some(hit) = self.cache.get(question, agent_type).await {
            tracing::debug!("Response cache hit for {}", agent_type);
            return hit;
        }

        let remote = if self.remote_enabled {
            let chain = first_success(&self.strategies, question, agent_type, context);
            match tokio::time::timeout(self.budget, chain).await {
                Ok(found) => found,
                Err(_) => {
                    tracing::warn!(
                        "Remote resolution for {} exceeded {:?}, using local template",
                        agent_type,
                        self.budget
                    );
                    None
                }
            }
        } else {
            None
        };

        let text = remote.unwrap_or_else(|| self.local(agent_type, question, context));
        self.cache.insert(question, agent_type, text.clone()).await;
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Slow;

    #[async_trait]
    impl ResolveStrategy for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn attempt(&self, _: &str, _: &str, _: Option<&ChatContext>) -> Option<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Some("too late".to_string())
        }
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl ResolveStrategy for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn attempt(&self, question: &str, _: &str, _: Option<&ChatContext>) -> Option<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Some(format!("remote: {}", question))
        }
    }

    fn cache() -> Arc<ResponseCache> {
        Arc::new(ResponseCache::new(Duration::from_secs(300)))
    }

    #[tokio::test]
    async fn test_local_only_finance() {
        let resolver = ResponseResolver::new(cache());
        let text = resolver
            .resolve("Where did the financial fraud happen?", "finance", None)
            .await;
        assert!(text.contains("XYZ Corp"));
        assert!(text.contains("New York"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_falls_back_to_local() {
        let resolver = ResponseResolver::new(cache())
            .with_strategy(Box::new(Slow))
            .with_budget(Duration::from_secs(15));
        let text = resolver.resolve("hello", "general", None).await;
        assert!(!text.is_empty());
        assert_ne!(text, "too late");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_strategies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver =
            ResponseResolver::new(cache()).with_strategy(Box::new(Counting(calls.clone())));
        let first = resolver.resolve("  who is the suspect? ", "theft", None).await;
        let second = resolver.resolve("who is the suspect?", "theft", None).await;
        assert_eq!(first, "remote:   who is the suspect? ");
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_fallback() {
        let resolver = ResponseResolver::new(cache())
            .with_fallback(Arc::new(|agent: &str, q: &str, _: Option<&ChatContext>| {
                format!("{}:{}", agent, q)
            }));
        assert_eq!(resolver.resolve("ping", "crime", None).await, "crime:ping");
    }
}
