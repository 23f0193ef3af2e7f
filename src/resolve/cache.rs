//! 回复缓存
//!
//! 键为 (question.trim(), agentType)。每个应用实例一份，由调用方注入；
//! 过期条目通过显式 [`ResponseCache::sweep`] 清理，读取时也不会返回过期值。
//! 有效期为 0 表示不缓存：写入被忽略，也不启动后台清理。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    inserted_at: Instant,
}

#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<(String, String), Entry>>,
}

fn cache_key(question: &str, agent_type: &str) -> (String, String) {
    (question.trim().to_string(), agent_type.to_string())
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, question: &str, agent_type: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(&cache_key(question, agent_type))
            .filter(|e| e.inserted_at.elapsed() < self.ttl)
            .map(|e| e.text.clone())
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl.is_zero()
    }

    pub async fn insert(&self, question: &str, agent_type: &str, text: String) {
        if self.is_disabled() {
            return;
        }
        self.entries.write().await.insert(
            cache_key(question, agent_type),
            Entry {
                text,
                inserted_at: Instant::now(),
            },
        );
    }

    /// 清除过期条目，返回清除数量
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
        before - entries.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// 后台定期 sweep，直到 token 被取消
pub fn spawn_sweeper(cache: Arc<ResponseCache>, token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if cache.is_disabled() {
            tracing::info!("Response cache disabled (ttl 0), sweeper not started");
            return;
        }
        let mut interval = tokio::time::interval(cache.ttl());
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    let removed = cache.sweep().await;
                    if removed > 0 {
                        tracing::debug!("Response cache sweep removed {} entries", removed);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_hit_trims_question() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.insert("  who did it? ", "murder", "the butler".into()).await;
        assert_eq!(
            cache.get("who did it?", "murder").await.as_deref(),
            Some("the butler")
        );
        assert_eq!(cache.get("who did it?", "theft").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_and_sweep() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.insert("q", "general", "a".into()).await;
        tokio::time::advance(Duration::from_secs(120)).await;
        cache.insert("q2", "general", "b".into()).await;

        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(cache.get("q", "general").await, None);
        assert_eq!(cache.get("q2", "general").await.as_deref(), Some("b"));

        assert_eq!(cache.sweep().await, 1);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_cancel() {
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(10)));
        cache.insert("q", "general", "a".into()).await;
        let token = CancellationToken::new();
        let handle = spawn_sweeper(Arc::clone(&cache), token.clone());

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(cache.is_empty().await);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache_and_sweeper() {
        let cache = Arc::new(ResponseCache::new(Duration::ZERO));
        cache.insert("q", "general", "a".into()).await;
        cache.insert("q2", "theft", "b".into()).await;
        assert!(cache.is_empty().await);
        assert_eq!(cache.get("q", "general").await, None);

        let handle = spawn_sweeper(Arc::clone(&cache), CancellationToken::new());
        handle.await.unwrap();
    }
}
