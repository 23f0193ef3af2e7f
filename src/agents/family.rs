//! 智能体家族：把智能体类型（字符串 id）归并为决定回复策略的家族

use serde::{Deserialize, Serialize};

/// 智能体家族；murder / theft / finance 三类有远端分析服务
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentFamily {
    Murder,
    Theft,
    Finance,
    Crime,
    Exchange,
    ChainSnatching,
    Accident,
    Abuse,
    General,
}

impl AgentFamily {
    /// 根据智能体类型推断家族，未知类型归入 General
    pub fn of(agent_type: &str) -> Self {
        match agent_type {
            "murder" | "crime-murder" | "murder-chief" | "murder-cop-2" | "murder-case-3" => {
                AgentFamily::Murder
            }
            "theft" | "crime-theft" => AgentFamily::Theft,
            "finance" | "financial-fraud" => AgentFamily::Finance,
            "crime" => AgentFamily::Crime,
            "exchange-matching" => AgentFamily::Exchange,
            "crime-chain-snatching" => AgentFamily::ChainSnatching,
            "crime-accident" => AgentFamily::Accident,
            "crime-abuse" => AgentFamily::Abuse,
            _ => AgentFamily::General,
        }
    }

    /// 是否有专门的远端分析服务
    pub fn has_backend(self) -> bool {
        matches!(
            self,
            AgentFamily::Murder | AgentFamily::Theft | AgentFamily::Finance
        )
    }

    /// 同源代理路由的路径段，如 murder-agent
    pub fn proxy_segment(self) -> Option<&'static str> {
        match self {
            AgentFamily::Murder => Some("murder-agent"),
            AgentFamily::Theft => Some("theft-agent"),
            AgentFamily::Finance => Some("financial-fraud-agent"),
            _ => None,
        }
    }
}
