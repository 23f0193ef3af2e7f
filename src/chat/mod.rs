//! 对话：消息与上下文模型、键值存储、多智能体对话编排

pub mod message;
pub mod orchestrator;
pub mod storage;

pub use message::{ChatContext, ChatMessage, MessageStatus, Sender};
pub use orchestrator::ChatOrchestrator;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
