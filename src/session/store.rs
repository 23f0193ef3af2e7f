//! 会话上下文存储：每个智能体一份 ChatContext、当前智能体、已选智能体列表
//!
//! 已选列表有序且永不为空（默认 general），当前智能体总在其中。凶案会话 id 额外镜像到键值存储。

use std::collections::HashMap;

use crate::agents::AgentFamily;
use crate::chat::storage::{KeyValueStore, MURDER_SESSION_KEY};
use crate::chat::ChatContext;
use crate::core::error::Result;
use crate::proxy::payload::NEW_SESSION_LITERAL;

pub const DEFAULT_AGENT: &str = "general";

#[derive(Debug, Clone)]
pub struct ContextStore {
    contexts: HashMap<String, ChatContext>,
    current_agent: String,
    selected: Vec<String>,
    murder_session: Option<String>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self {
            contexts: HashMap::new(),
            current_agent: DEFAULT_AGENT.to_string(),
            selected: vec![DEFAULT_AGENT.to_string()],
            murder_session: None,
        }
    }
}

fn usable_session(id: Option<String>) -> Option<String> {
    id.filter(|s| !s.trim().is_empty() && s != NEW_SESSION_LITERAL)
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_agent(&self) -> &str {
        &self.current_agent
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, agent: &str) -> bool {
        self.selected.iter().any(|a| a == agent)
    }

    pub fn context(&self, agent: &str) -> Option<&ChatContext> {
        self.contexts.get(agent)
    }

    pub fn current_context(&self) -> Option<&ChatContext> {
        self.contexts.get(&self.current_agent)
    }

    /// 写入上下文；凶案家族的会话 id 同步为当前凶案会话
    pub fn set_context(&mut self, agent: &str, context: ChatContext) {
        if AgentFamily::of(agent) == AgentFamily::Murder {
            if let Some(id) = usable_session(context.session_id.clone()) {
                self.murder_session = Some(id);
            }
        }
        self.contexts.insert(agent.to_string(), context);
    }

    /// 切换当前智能体，未选中的同时加入已选列表
    pub fn set_current_agent(&mut self, agent: &str, context: Option<ChatContext>) {
        self.current_agent = agent.to_string();
        if !self.is_selected(agent) {
            self.selected.push(agent.to_string());
        }
        if let Some(ctx) = context {
            self.set_context(agent, ctx);
        }
    }

    /// 加入已选列表，已存在时返回 false
    pub fn select(&mut self, agent: &str) -> bool {
        if self.is_selected(agent) {
            return false;
        }
        self.selected.push(agent.to_string());
        true
    }

    /// 移出已选列表；最后一个不移除。移除当前智能体时切换到列表首位
    pub fn deselect(&mut self, agent: &str) -> bool {
        if self.selected.len() <= 1 || !self.is_selected(agent) {
            return false;
        }
        self.selected.retain(|a| a != agent);
        if self.current_agent == agent {
            if let Some(first) = self.selected.first() {
                self.current_agent = first.clone();
            }
        }
        true
    }

    pub fn murder_session(&self) -> Option<&str> {
        self.murder_session.as_deref()
    }

    pub fn set_murder_session(&mut self, id: Option<String>) {
        self.murder_session = usable_session(id);
    }

    /// 清空凶案上下文与会话 id
    pub fn clear_murder(&mut self) {
        self.contexts
            .retain(|agent, _| AgentFamily::of(agent) != AgentFamily::Murder);
        self.murder_session = None;
    }

    /// 会话 id 镜像到存储；None 时删除键
    pub fn persist_session(&self, storage: &dyn KeyValueStore) -> Result<()> {
        match &self.murder_session {
            Some(id) => storage.set(MURDER_SESSION_KEY, id),
            None => storage.remove(MURDER_SESSION_KEY),
        }
    }

    pub fn restore_session(&mut self, storage: &dyn KeyValueStore) -> Result<()> {
        self.murder_session = usable_session(storage.get(MURDER_SESSION_KEY)?);
        Ok(())
    }
}
