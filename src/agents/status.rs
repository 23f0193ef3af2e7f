//! 智能体启用状态
//!
//! 每个应用实例一份，初始时注册表中所有 id 均为 false，再叠加配置中的 enabled_agents。

use std::collections::BTreeMap;
use std::collections::HashMap;

use tokio::sync::RwLock;

use super::AgentRegistry;

#[derive(Debug, Default)]
pub struct AgentStatusStore {
    inner: RwLock<BTreeMap<String, bool>>,
}

impl AgentStatusStore {
    pub fn new(registry: &AgentRegistry, overrides: &HashMap<String, bool>) -> Self {
        let mut map: BTreeMap<String, bool> =
            registry.ids().map(|id| (id.to_string(), false)).collect();
        for (id, enabled) in overrides {
            map.insert(id.clone(), *enabled);
        }
        Self {
            inner: RwLock::new(map),
        }
    }

    pub async fn snapshot(&self) -> BTreeMap<String, bool> {
        self.inner.read().await.clone()
    }

    pub async fn is_enabled(&self, id: &str) -> bool {
        self.inner.read().await.get(id).copied().unwrap_or(false)
    }

    /// 设置单个智能体；未知 id 也会被记录
    pub async fn set(&self, id: &str, enabled: bool) {
        self.inner.write().await.insert(id.to_string(), enabled);
        tracing::info!(
            "Agent {} {}",
            id,
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// 批量合并，返回合并后的完整快照
    pub async fn merge(&self, updates: HashMap<String, bool>) -> BTreeMap<String, bool> {
        let mut guard = self.inner.write().await;
        guard.extend(updates);
        guard.clone()
    }
}
