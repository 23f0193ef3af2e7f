//! 对话编排器
//!
//! 一条用户消息发给所有已选智能体：当前智能体在输入延迟后回复，其余按顺序错峰回复。
//! 消息、上下文、输入状态都在一把 tokio Mutex 之后，等待网络或延迟时从不持锁。
//! 每次变更后把消息记录写入键值存储。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{Mutex, MutexGuard};

use crate::chat::message::{ChatContext, ChatMessage};
use crate::chat::storage::{KeyValueStore, CHAT_MESSAGES_KEY};
use crate::config::AppConfig;
use crate::core::error::{PrecinctError, Result};
use crate::proxy::{http_client, MurderBackend, MurderChannel};
use crate::resolve::{ResponseCache, ResponseResolver};
use crate::session::{ContextStore, IntakeFlow};

/// 走案件采集流程的智能体
pub fn uses_intake(agent_type: &str) -> bool {
    matches!(agent_type, "murder" | "crime-murder")
}

#[derive(Default)]
struct ChatState {
    messages: Vec<ChatMessage>,
    contexts: ContextStore,
    typing: bool,
    turn: u64,
    /// (轮次, 智能体)：同一轮每个智能体只回复一次
    responded: HashSet<(u64, String)>,
}

pub struct ChatOrchestrator {
    state: Mutex<ChatState>,
    resolver: Arc<ResponseResolver>,
    flow: IntakeFlow,
    storage: Arc<dyn KeyValueStore>,
    typing_delay: Duration,
    stagger: Duration,
}

impl ChatOrchestrator {
    pub fn new(resolver: Arc<ResponseResolver>, flow: IntakeFlow, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: Mutex::new(ChatState::default()),
            resolver,
            flow,
            storage,
            typing_delay: Duration::from_millis(1000),
            stagger: Duration::from_millis(1000),
        }
    }

    pub fn with_delays(mut self, typing_delay: Duration, stagger: Duration) -> Self {
        self.typing_delay = typing_delay;
        self.stagger = stagger;
        self
    }

    /// 远端关闭时凶案采集完全本地运行
    pub fn from_config(config: &AppConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let cache = Arc::new(ResponseCache::new(config.augment.cache_ttl()));
        let resolver = Arc::new(ResponseResolver::from_config(config, cache)?);
        let channel: Option<Arc<dyn MurderChannel>> = if config.remote_enabled() {
            Some(Arc::new(MurderBackend::new(http_client(config)?, config)))
        } else {
            None
        };
        Ok(Self::new(resolver, IntakeFlow::new(channel), storage).with_delays(
            Duration::from_millis(config.chat.typing_delay_ms),
            Duration::from_millis(config.chat.stagger_ms),
        ))
    }

    pub fn resolver(&self) -> &Arc<ResponseResolver> {
        &self.resolver
    }

    fn persist(&self, state: &ChatState) {
        let result = serde_json::to_string(&state.messages)
            .map_err(PrecinctError::from)
            .and_then(|json| self.storage.set(CHAT_MESSAGES_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to persist chat messages: {}", e);
        }
    }

    fn persist_session(&self, state: &ChatState) {
        if let Err(e) = state.contexts.persist_session(self.storage.as_ref()) {
            tracing::warn!("Failed to persist murder session id: {}", e);
        }
    }

    async fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().await
    }

    /// 从存储恢复消息记录与凶案会话 id；记录损坏时删除该键并从空开始
    pub async fn load(&self) -> usize {
        let mut state = self.lock().await;
        match self.storage.get(CHAT_MESSAGES_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
                Ok(messages) => state.messages = messages,
                Err(e) => {
                    tracing::warn!("Discarding corrupt chat history: {}", e);
                    state.messages.clear();
                    if let Err(e) = self.storage.remove(CHAT_MESSAGES_KEY) {
                        tracing::warn!("Failed to remove chat history: {}", e);
                    }
                }
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read chat history: {}", e),
        }
        if let Err(e) = state.contexts.restore_session(self.storage.as_ref()) {
            tracing::warn!("Failed to read murder session id: {}", e);
        }
        tracing::info!("Loaded {} chat messages", state.messages.len());
        state.messages.len()
    }

    /// 发送一条消息；返回本轮新增的消息（用户消息在前）。空白内容什么也不做
    pub async fn send(&self, content: &str) -> Vec<ChatMessage> {
        let text = content.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let (turn, user_message, agents) = {
            let mut state = self.lock().await;
            state.turn += 1;
            let turn = state.turn;
            let current = state.contexts.current_agent().to_string();
            let context = state.contexts.current_context().cloned();
            let user_message = ChatMessage::user(content, &current).with_context(context);
            state.messages.push(user_message.clone());
            state.typing = true;
            self.persist(&state);

            let mut agents = vec![current.clone()];
            agents.extend(
                state
                    .contexts
                    .selected()
                    .iter()
                    .filter(|a| **a != current)
                    .cloned(),
            );
            (turn, user_message, agents)
        };

        let replies = agents.iter().enumerate().map(|(i, agent)| {
            let delay = self.typing_delay + self.stagger * i as u32;
            self.reply_after(turn, agent, text, delay, i == 0)
        });
        let appended: Vec<ChatMessage> = join_all(replies).await.into_iter().flatten().collect();

        {
            let mut state = self.lock().await;
            state.responded.retain(|(t, _)| *t != turn);
        }

        let mut out = Vec::with_capacity(appended.len() + 1);
        out.push(user_message);
        out.extend(appended);
        out
    }

    async fn reply_after(
        &self,
        turn: u64,
        agent: &str,
        question: &str,
        delay: Duration,
        is_current: bool,
    ) -> Option<ChatMessage> {
        let (text, context) = tokio::join!(self.reply_for(agent, question), async {
            tokio::time::sleep(delay).await;
        })
        .0;

        let mut state = self.lock().await;
        if !state.responded.insert((turn, agent.to_string())) {
            return None;
        }
        let message = ChatMessage::assistant(text, agent).with_context(context);
        state.messages.push(message.clone());
        if is_current {
            state.typing = false;
        }
        self.persist(&state);
        Some(message)
    }

    /// 计算一个智能体的回复，返回 (正文, 回复后的上下文)
    async fn reply_for(&self, agent: &str, question: &str) -> (String, Option<ChatContext>) {
        let (context, session) = {
            let state = self.lock().await;
            (
                state.contexts.context(agent).cloned(),
                state.contexts.murder_session().map(str::to_string),
            )
        };

        if !uses_intake(agent) {
            let text = self.resolver.resolve(question, agent, context.as_ref()).await;
            return (text, context);
        }

        let mut context = context.unwrap_or_else(|| ChatContext::murder_intake(self.flow.is_live()));
        if context.session_id.is_none() {
            context.session_id = session;
        }
        let turn = self.flow.respond(question, context).await;

        let mut state = self.lock().await;
        state.contexts.set_context(agent, turn.context.clone());
        self.persist_session(&state);
        (turn.reply, Some(turn.context))
    }

    /// 清空内存中的消息与存储中的记录
    pub async fn clear(&self) {
        let mut state = self.lock().await;
        state.messages.clear();
        if let Err(e) = self.storage.remove(CHAT_MESSAGES_KEY) {
            tracing::warn!("Failed to clear chat history: {}", e);
        }
        tracing::info!("Chat history cleared");
    }

    /// 切换当前智能体；对话为空且切到凶案智能体时先发问候语
    pub async fn set_current_agent(&self, agent: &str, context: Option<ChatContext>) {
        let mut state = self.lock().await;
        state.contexts.set_current_agent(agent, context);

        if uses_intake(agent) && state.messages.is_empty() {
            if state.contexts.context(agent).is_none() {
                let fresh = ChatContext::murder_intake(self.flow.is_live());
                state.contexts.set_context(agent, fresh);
            }
            let context = state.contexts.context(agent).cloned();
            let greeting = ChatMessage::assistant(self.flow.greeting(), agent).with_context(context);
            state.messages.push(greeting);
        }
        self.persist(&state);
        tracing::info!("Current agent set to {}", agent);
    }

    pub async fn select_agent(&self, agent: &str) -> bool {
        self.lock().await.contexts.select(agent)
    }

    /// 不会移除最后一个已选智能体
    pub async fn deselect_agent(&self, agent: &str) -> bool {
        self.lock().await.contexts.deselect(agent)
    }

    /// 重置凶案会话：清空上下文与会话 id，重新发问候语，远端尽力开启新会话
    pub async fn reset_murder_session(&self) -> ChatMessage {
        let agent = {
            let mut state = self.lock().await;
            state.contexts.clear_murder();
            self.persist_session(&state);
            let current = state.contexts.current_agent();
            if uses_intake(current) {
                current.to_string()
            } else {
                "murder".to_string()
            }
        };

        let turn = self.flow.reset().await;

        let mut state = self.lock().await;
        state.contexts.set_murder_session(turn.context.session_id.clone());
        state.contexts.set_context(&agent, turn.context.clone());
        self.persist_session(&state);
        let greeting = ChatMessage::assistant(turn.reply, &agent).with_context(Some(turn.context));
        state.messages.push(greeting.clone());
        self.persist(&state);
        tracing::info!("Murder session reset");
        greeting
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.lock().await.messages.clone()
    }

    pub async fn is_typing(&self) -> bool {
        self.lock().await.typing
    }

    pub async fn selected_agents(&self) -> Vec<String> {
        self.lock().await.contexts.selected().to_vec()
    }

    pub async fn current_agent(&self) -> String {
        self.lock().await.contexts.current_agent().to_string()
    }

    pub async fn context(&self, agent: &str) -> Option<ChatContext> {
        self.lock().await.contexts.context(agent).cloned()
    }

    pub async fn murder_session(&self) -> Option<String> {
        self.lock()
            .await
            .contexts
            .murder_session()
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::Sender;
    use crate::chat::storage::MemoryStore;
    use crate::session::IntakeState;

    fn orchestrator(storage: Arc<dyn KeyValueStore>) -> ChatOrchestrator {
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(300)));
        ChatOrchestrator::new(
            Arc::new(ResponseResolver::new(cache)),
            IntakeFlow::local(),
            storage,
        )
        .with_delays(Duration::from_millis(1000), Duration::from_millis(1000))
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_send_is_noop() {
        let chat = orchestrator(Arc::new(MemoryStore::new()));
        assert!(chat.send("   ").await.is_empty());
        assert!(chat.messages().await.is_empty());
        assert!(!chat.is_typing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_cleared_after_reply() {
        let chat = orchestrator(Arc::new(MemoryStore::new()));
        let added = chat.send("hello").await;
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].sender, Sender::User);
        assert_eq!(added[1].agent_type, "general");
        assert!(!chat.is_typing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replies_are_staggered() {
        let chat = orchestrator(Arc::new(MemoryStore::new()));
        chat.select_agent("theft").await;
        chat.select_agent("crime").await;

        let start = tokio::time::Instant::now();
        chat.send("who is the suspect?").await;
        assert!(start.elapsed() >= Duration::from_millis(3000));

        let agents: Vec<String> = chat
            .messages()
            .await
            .into_iter()
            .filter(|m| m.sender == Sender::Assistant)
            .map(|m| m.agent_type)
            .collect();
        assert_eq!(agents, vec!["general", "theft", "crime"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_history_is_discarded() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(CHAT_MESSAGES_KEY, "{not json").unwrap();
        let chat = orchestrator(storage.clone());
        assert_eq!(chat.load().await, 0);
        assert_eq!(storage.get(CHAT_MESSAGES_KEY).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_murder_greeting_and_intake() {
        let chat = orchestrator(Arc::new(MemoryStore::new()));
        chat.set_current_agent("murder", None).await;
        let log = chat.messages().await;
        assert_eq!(log.len(), 1);
        assert!(log[0].content.ends_with("What is the Case ID for this investigation?"));

        chat.send("MC-12").await;
        let ctx = chat.context("murder").await.unwrap();
        assert_eq!(ctx.collected_data.get("case_id").map(String::as_str), Some("MC-12"));
        assert_eq!(ctx.current_step.map(|s| s.step_name()), Some("date_of_crime"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_to_greeting() {
        let chat = orchestrator(Arc::new(MemoryStore::new()));
        chat.set_current_agent("murder", None).await;
        chat.send("MC-12").await;
        chat.reset_murder_session().await;

        let ctx = chat.context("murder").await.unwrap();
        assert_eq!(ctx.intake_state(), IntakeState::Greeting);
        assert!(ctx.collected_data.is_empty());
        assert_eq!(chat.murder_session().await, None);
    }
}
