//! 智能体注册表
//!
//! 静态智能体描述列表（id / 名称 / 颜色 / 能力），加载后不可变。
//! 来源可以是配置中的 [[agents]]，也可以是外部 JSON；来源为空或无效时静默回退到内置默认列表。

use serde::{Deserialize, Serialize};

use super::AgentFamily;

/// 智能体描述；身份由 id 决定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_avatar_color")]
    pub avatar_color: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,
}

fn default_avatar_color() -> String {
    "#6b7280".to_string()
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            avatar_color: default_avatar_color(),
            capabilities: Vec::new(),
            crime_type: None,
            parent_type: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.avatar_color = color.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.capabilities = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_crime_type(mut self, crime_type: impl Into<String>) -> Self {
        self.crime_type = Some(crime_type.into());
        self
    }

    pub fn with_parent(mut self, parent_type: impl Into<String>) -> Self {
        self.parent_type = Some(parent_type.into());
        self
    }

    pub fn family(&self) -> AgentFamily {
        AgentFamily::of(&self.id)
    }

    fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && !self.name.trim().is_empty()
    }
}

/// 智能体注册表：只读
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self {
            agents: default_agents(),
        }
    }
}

impl AgentRegistry {
    /// 用给定列表构建；列表为空或含无效项（缺 id / name）时回退到默认列表
    pub fn from_agents(agents: Vec<Agent>) -> Self {
        if agents.is_empty() || agents.iter().any(|a| !a.is_valid()) {
            if !agents.is_empty() {
                tracing::warn!("Agent list contains invalid entries, using default agents");
            }
            return Self::default();
        }
        Self { agents }
    }

    /// 从外部 JSON 负载构建（数组或 {"agents": [...]}），解析失败回退到默认列表
    pub fn from_json(payload: &str) -> Self {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Payload {
            List(Vec<Agent>),
            Wrapped { agents: Vec<Agent> },
        }

        match serde_json::from_str::<Payload>(payload) {
            Ok(Payload::List(agents)) | Ok(Payload::Wrapped { agents }) => {
                Self::from_agents(agents)
            }
            Err(e) => {
                tracing::warn!("Invalid agent payload ({}), using default agents", e);
                Self::default()
            }
        }
    }

    pub fn all(&self) -> &[Agent] {
        &self.agents
    }

    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|a| a.id.as_str())
    }

    /// 展示名，未注册的 id 原样返回
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|a| a.name.as_str()).unwrap_or(id)
    }
}

/// 内置默认智能体
pub fn default_agents() -> Vec<Agent> {
    vec![
        Agent::new("general", "General Assistant")
            .with_description("General investigation help and navigation of the system")
            .with_color("#3b82f6")
            .with_capabilities(&["case overview", "system help", "agent routing"]),
        Agent::new("crime", "Crime Agent")
            .with_description("Crime mapping, statistics, suspects and evidence")
            .with_color("#ef4444")
            .with_capabilities(&["crime mapping", "statistics", "suspect analysis"]),
        Agent::new("murder", "Murder Agent")
            .with_description("Homicide investigation with guided case intake and analysis")
            .with_color("#b91c1c")
            .with_capabilities(&["case intake", "forensic analysis", "suspect profiling", "timeline reconstruction"])
            .with_crime_type("murder")
            .with_parent("crime"),
        Agent::new("murder-chief", "Murder Chief")
            .with_description("Leads the investigation on Murder Case 1")
            .with_color("#991b1b")
            .with_capabilities(&["team coordination", "resource planning"])
            .with_crime_type("murder")
            .with_parent("murder"),
        Agent::new("murder-cop-2", "Murder Cop 2")
            .with_description("Works on Murder Case 2, currently in progress")
            .with_color("#7f1d1d")
            .with_capabilities(&["scene security", "witness interviews"])
            .with_crime_type("murder")
            .with_parent("murder"),
        Agent::new("murder-case-3", "Murder Case 3 Investigator")
            .with_description("Specialised investigator for the open Murder Case 3")
            .with_color("#dc2626")
            .with_capabilities(&["case review", "forensic follow-up"])
            .with_crime_type("murder")
            .with_parent("murder"),
        Agent::new("theft", "Theft Agent")
            .with_description("Theft patterns, security recommendations and stolen goods tracking")
            .with_color("#f59e0b")
            .with_capabilities(&["pattern analysis", "evidence collection", "stolen goods tracking"])
            .with_crime_type("theft")
            .with_parent("crime"),
        Agent::new("finance", "Financial Fraud Agent")
            .with_description("Insider trading, market manipulation and money laundering")
            .with_color("#10b981")
            .with_capabilities(&["fraud detection", "transaction analysis", "insider trading"])
            .with_crime_type("financial-fraud"),
        Agent::new("financial-fraud", "Financial Fraud Investigator")
            .with_description("Fraud type breakdown and suspicious transaction patterns")
            .with_color("#059669")
            .with_capabilities(&["fraud types", "stock manipulation"])
            .with_crime_type("financial-fraud")
            .with_parent("finance"),
        Agent::new("exchange-matching", "Exchange Matching Agent")
            .with_description("Cross-exchange discrepancies and money movement")
            .with_color("#8b5cf6")
            .with_capabilities(&["mismatch detection", "money flow analysis"]),
        Agent::new("crime-accident", "Accident Agent")
            .with_description("Accident reconstruction and negligence assessment")
            .with_color("#0ea5e9")
            .with_capabilities(&["reconstruction", "cause analysis", "negligence assessment"])
            .with_crime_type("accident")
            .with_parent("crime"),
        Agent::new("crime-abuse", "Abuse Agent")
            .with_description("Abuse cases, victim support and risk assessment")
            .with_color("#ec4899")
            .with_capabilities(&["victim support", "risk assessment", "pattern recognition"])
            .with_crime_type("abuse")
            .with_parent("crime"),
        Agent::new("crime-chain-snatching", "Chain Snatching Agent")
            .with_description("Hotspot mapping and offender tracking for chain snatching")
            .with_color("#f97316")
            .with_capabilities(&["hotspot mapping", "offender tracking"])
            .with_crime_type("chain-snatching")
            .with_parent("crime"),
        Agent::new("smuggle", "Smuggling Agent")
            .with_description("Smuggling routes and detection techniques")
            .with_color("#14b8a6")
            .with_capabilities(&["route analysis", "detection"])
            .with_crime_type("smuggling")
            .with_parent("crime"),
    ]
}
