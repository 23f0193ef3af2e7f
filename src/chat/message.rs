//! 对话消息与案件上下文
//!
//! ChatMessage 创建后不再修改，只追加；ChatContext 每个智能体一份，以 camelCase 序列化，
//! 与存储中的 JSON 及 HTTP 接口保持一致。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::intake::IntakeState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// 用户消息为 sent，智能体回复为 delivered；旧记录中的 read 按 delivered 读入
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    #[serde(alias = "read")]
    Delivered,
}

/// 单条对话消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    /// RFC 3339
    pub timestamp: String,
    pub status: MessageStatus,
    pub agent_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ChatContext>,
}

impl ChatMessage {
    fn new(sender: Sender, status: MessageStatus, content: String, agent_type: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            content,
            timestamp: chrono::Utc::now().to_rfc3339(),
            status,
            agent_type: agent_type.to_string(),
            context: None,
        }
    }

    pub fn user(content: impl Into<String>, agent_type: &str) -> Self {
        Self::new(Sender::User, MessageStatus::Sent, content.into(), agent_type)
    }

    pub fn assistant(content: impl Into<String>, agent_type: &str) -> Self {
        Self::new(
            Sender::Assistant,
            MessageStatus::Delivered,
            content.into(),
            agent_type,
        )
    }

    pub fn with_context(mut self, context: Option<ChatContext>) -> Self {
        self.context = context;
        self
    }
}

/// 案件上下文：案件属性、采集进度与远端会话
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,

    // 案件
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    // 凶案
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crime_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crime_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victim_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub victim_age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victim_gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause_of_death: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weapon_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crime_scene_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witnesses: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspects: Option<String>,

    // 盗窃
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stolen_items: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub estimated_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theft_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspect_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crime_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_list: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness_statements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,

    // 金融诈骗
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraud_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub fraud_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraud_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_details: Option<String>,

    // 会话与采集
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub using_live_backend: bool,
    pub is_collecting_info: bool,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_step")]
    pub current_step: Option<IntakeState>,
    #[serde(deserialize_with = "lenient_map")]
    pub collected_data: BTreeMap<String, String>,
}

/// 数字、布尔等标量统一转为字符串
fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value))
}

fn lenient_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k, v)))
        .collect())
}

/// 未知步骤名视为缺省
fn lenient_step<'de, D>(deserializer: D) -> Result<Option<IntakeState>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(IntakeState::from_step_name))
}

/// 远端返回的 collected_data 转为字符串表
pub fn string_map(value: Option<&serde_json::Value>) -> BTreeMap<String, String> {
    match value {
        Some(serde_json::Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| scalar_to_string(v.clone()).map(|v| (k.clone(), v)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

impl ChatContext {
    /// 凶案智能体重置后的初始上下文
    pub fn murder_intake(using_live_backend: bool) -> Self {
        Self {
            agent_type: Some("murder".to_string()),
            using_live_backend,
            is_collecting_info: true,
            current_step: Some(IntakeState::Greeting),
            ..Default::default()
        }
    }

    pub fn intake_state(&self) -> IntakeState {
        self.current_step.unwrap_or_default()
    }

    /// collectedData 优先，其次是同名的上下文字段
    pub fn field(&self, key: &str) -> Option<&str> {
        if let Some(v) = self.collected_data.get(key).filter(|v| !v.is_empty()) {
            return Some(v.as_str());
        }
        let direct = match key {
            "case_id" => &self.case_id,
            "date_of_crime" => &self.crime_date,
            "time_of_crime" => &self.crime_time,
            "location" => &self.location,
            "victim_name" => &self.victim_name,
            "victim_age" => &self.victim_age,
            "victim_gender" => &self.victim_gender,
            "cause_of_death" => &self.cause_of_death,
            "weapon_used" => &self.weapon_used,
            "crime_scene_description" => &self.crime_scene_description,
            "witnesses" => &self.witnesses,
            "evidence_found" => &self.evidence,
            "suspects" => &self.suspects,
            "additional_notes" => &self.additional_notes,
            _ => return None,
        };
        direct.as_deref().filter(|v| !v.is_empty())
    }
}
