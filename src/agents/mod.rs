//! 智能体：注册表、家族划分、启用状态、推荐问题

pub mod family;
pub mod registry;
pub mod status;
pub mod suggested;

pub use family::AgentFamily;
pub use registry::{default_agents, Agent, AgentRegistry};
pub use status::AgentStatusStore;
pub use suggested::suggested_questions;
