//! 会话：案件采集状态机、凶案采集流程、按智能体划分的上下文存储

pub mod flow;
pub mod intake;
pub mod store;

pub use flow::{IntakeFlow, IntakeTurn};
pub use intake::{transition, CaseField, IntakeEvent, IntakeState};
pub use store::ContextStore;
