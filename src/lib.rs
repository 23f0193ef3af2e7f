//! precinct - 警务侦查看板的智能体会话编排层
//!
//! 模块划分：
//! - **agents**: 智能体注册表、家族划分、启用状态、推荐问题
//! - **chat**: 消息与案件上下文、键值存储、多智能体对话编排
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与优雅关闭
//! - **observability**: tracing 初始化
//! - **proxy**: 按罪案类型转发到外部分析服务
//! - **resolve**: 回复缓存、远端策略链、本地关键词模板
//! - **server**: HTTP 接口（feature `web`）
//! - **session**: 凶案案件采集状态机与上下文存储

pub mod agents;
pub mod chat;
pub mod config;
pub mod core;
pub mod observability;
pub mod proxy;
pub mod resolve;
#[cfg(feature = "web")]
pub mod server;
pub mod session;
