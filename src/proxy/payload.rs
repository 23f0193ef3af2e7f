//! 上下文到各罪案类型外部服务请求体的映射（snake_case 字段）

use serde_json::{Map, Value};

use crate::chat::ChatContext;
use crate::session::intake::IntakeState;

/// 继续分析的特殊指令
pub const CONTINUE_ANALYSIS: &str = "CONTINUE_ANALYSIS";
/// 强制新会话的特殊指令
pub const FORCE_NEW_SESSION: &str = "FORCE_NEW_SESSION";
/// 客户端用来表示「还没有会话」的字面值
pub const NEW_SESSION_LITERAL: &str = "new session";

fn put(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        map.insert(key.to_string(), Value::String(v.to_string()));
    }
}

fn base(question: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("question".into(), Value::String(question.to_string()));
    map.insert("additional_notes".into(), Value::String(question.to_string()));
    map
}

pub fn theft_payload(question: &str, ctx: Option<&ChatContext>) -> Value {
    let mut map = base(question);
    if let Some(c) = ctx {
        put(&mut map, "case_id", &c.case_id);
        put(&mut map, "victim_name", &c.victim_name);
        put(&mut map, "suspect_name", &c.suspect_name);
        put(&mut map, "crime_location", &c.crime_location);
        put(&mut map, "crime_date", &c.crime_date);
        put(&mut map, "stolen_items", &c.stolen_items);
        put(&mut map, "estimated_value", &c.estimated_value);
        put(&mut map, "theft_method", &c.theft_method);
        put(&mut map, "evidence_list", &c.evidence_list);
        put(&mut map, "witness_statements", &c.witness_statements);
        put(&mut map, "additional_notes", &c.additional_notes);
    }
    Value::Object(map)
}

pub fn finance_payload(question: &str, ctx: Option<&ChatContext>) -> Value {
    let mut map = base(question);
    if let Some(c) = ctx {
        put(&mut map, "case_id", &c.case_id);
        put(&mut map, "victim_name", &c.victim_name);
        put(&mut map, "suspect_name", &c.suspect_name);
        put(&mut map, "fraud_type", &c.fraud_type);
        put(&mut map, "fraud_amount", &c.fraud_amount);
        put(&mut map, "fraud_date", &c.fraud_date);
        put(&mut map, "financial_institution", &c.financial_institution);
        put(&mut map, "transaction_details", &c.transaction_details);
        put(&mut map, "evidence_list", &c.evidence_list);
        put(&mut map, "additional_notes", &c.additional_notes);
    }
    Value::Object(map)
}

/// 凶案服务请求体
///
/// - `CONTINUE_ANALYSIS`：改写为 analyze 并置 force_analysis
/// - `FORCE_NEW_SESSION` 或 force_reset：置 reset_conversation / force_new_session，丢弃会话 id
/// - 空问题：视为初始化
/// - 新会话且无案件编号时生成 `case_<毫秒时间戳>`
pub fn murder_payload(
    question: &str,
    ctx: Option<&ChatContext>,
    session_id: Option<&str>,
    force_reset: bool,
) -> Value {
    let mut map = base(question);
    let mut session = session_id
        .filter(|s| !s.is_empty() && *s != NEW_SESSION_LITERAL)
        .map(str::to_string);
    let mut new_session = false;

    if question == CONTINUE_ANALYSIS {
        map.insert("question".into(), "analyze".into());
        map.insert("additional_notes".into(), "Please complete the analysis".into());
        map.insert("force_analysis".into(), Value::Bool(true));
    } else if question == FORCE_NEW_SESSION {
        map.insert("question".into(), "initialize".into());
        map.insert("additional_notes".into(), "Please start a new conversation".into());
        map.insert("reset_conversation".into(), Value::Bool(true));
        map.insert("force_new_session".into(), Value::Bool(true));
        new_session = true;
    } else if question.trim().is_empty() {
        map.insert("question".into(), "initialize".into());
        map.insert("additional_notes".into(), "Please start a new conversation".into());
        map.insert("reset_conversation".into(), Value::Bool(true));
    }

    if force_reset {
        map.insert("reset_conversation".into(), Value::Bool(true));
        map.insert("force_new_session".into(), Value::Bool(true));
        new_session = true;
    }

    if new_session {
        session = None;
    } else if session.is_none() {
        session = ctx
            .and_then(|c| c.session_id.clone())
            .filter(|s| !s.is_empty() && s != NEW_SESSION_LITERAL);
    }
    map.insert(
        "session_id".into(),
        session.map(Value::String).unwrap_or(Value::Null),
    );

    if let Some(c) = ctx {
        put(&mut map, "case_id", &c.case_id);
        put(&mut map, "case_name", &c.case_name);
        put(&mut map, "case_status", &c.case_status);
        put(&mut map, "case_priority", &c.case_priority);
        put(&mut map, "assigned_to", &c.assigned_to);
        put(&mut map, "assigned_date", &c.assigned_date);
        put(&mut map, "location", &c.location);
        put(&mut map, "date_of_crime", &c.crime_date);
        put(&mut map, "time_of_crime", &c.crime_time);
        put(&mut map, "victim_name", &c.victim_name);
        put(&mut map, "victim_age", &c.victim_age);
        put(&mut map, "victim_gender", &c.victim_gender);
        put(&mut map, "cause_of_death", &c.cause_of_death);
        put(&mut map, "weapon_used", &c.weapon_used);
        put(&mut map, "crime_scene_description", &c.crime_scene_description);
        put(&mut map, "witnesses", &c.witnesses);
        put(&mut map, "evidence_found", &c.evidence);
        put(&mut map, "suspects", &c.suspects);

        for (k, v) in c.collected_data.iter().filter(|(_, v)| !v.is_empty()) {
            map.insert(k.clone(), Value::String(v.clone()));
        }

        // greeting 与 case_id 阶段不带步骤，由服务端把第一条消息当作案件编号
        match c.current_step {
            Some(IntakeState::Greeting) | None => {}
            Some(step) if step.step_name() == "case_id" => {}
            Some(step) => {
                map.insert("current_step".into(), step.step_name().into());
            }
        }
    }

    let resetting = map.get("reset_conversation").and_then(Value::as_bool) == Some(true);
    if !map.contains_key("case_id") && (new_session || resetting) {
        let generated = format!("case_{}", chrono::Utc::now().timestamp_millis());
        map.insert("case_id".into(), Value::String(generated));
    }

    Value::Object(map)
}

/// 请求体中的步骤是否为分析阶段（用于区分超时提示）
pub fn is_analysis_step(payload: &Value) -> bool {
    payload.get("force_analysis").and_then(Value::as_bool) == Some(true)
        || matches!(
            payload.get("current_step").and_then(Value::as_str),
            Some("additional_notes") | Some("analysis_pending")
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::intake::CaseField;

    #[test]
    fn test_theft_payload_maps_fields() {
        let ctx = ChatContext {
            case_id: Some("T-1".into()),
            stolen_items: Some("laptop".into()),
            estimated_value: Some("1200".into()),
            ..Default::default()
        };
        let p = theft_payload("what was stolen?", Some(&ctx));
        assert_eq!(p["question"], "what was stolen?");
        assert_eq!(p["additional_notes"], "what was stolen?");
        assert_eq!(p["case_id"], "T-1");
        assert_eq!(p["stolen_items"], "laptop");
        assert!(p.get("fraud_type").is_none());
    }

    #[test]
    fn test_finance_payload_overrides_notes() {
        let ctx = ChatContext {
            fraud_type: Some("insider trading".into()),
            additional_notes: Some("flagged by audit".into()),
            ..Default::default()
        };
        let p = finance_payload("who?", Some(&ctx));
        assert_eq!(p["fraud_type"], "insider trading");
        assert_eq!(p["additional_notes"], "flagged by audit");
    }

    #[test]
    fn test_continue_analysis() {
        let p = murder_payload(CONTINUE_ANALYSIS, None, Some("s-1"), false);
        assert_eq!(p["question"], "analyze");
        assert_eq!(p["force_analysis"], true);
        assert_eq!(p["session_id"], "s-1");
        assert!(is_analysis_step(&p));
    }

    #[test]
    fn test_force_new_session_drops_session_and_generates_case_id() {
        let ctx = ChatContext {
            session_id: Some("old".into()),
            ..Default::default()
        };
        let p = murder_payload(FORCE_NEW_SESSION, Some(&ctx), Some("s-1"), true);
        assert_eq!(p["question"], "initialize");
        assert_eq!(p["force_new_session"], true);
        assert_eq!(p["session_id"], Value::Null);
        assert!(p["case_id"].as_str().unwrap().starts_with("case_"));
    }

    #[test]
    fn test_new_session_literal_and_context_session() {
        let ctx = ChatContext {
            session_id: Some("ctx-session".into()),
            ..Default::default()
        };
        let p = murder_payload("hello", Some(&ctx), Some(NEW_SESSION_LITERAL), false);
        assert_eq!(p["session_id"], "ctx-session");
        let p = murder_payload("hello", None, Some(NEW_SESSION_LITERAL), false);
        assert_eq!(p["session_id"], Value::Null);
    }

    #[test]
    fn test_empty_question_initialises() {
        let p = murder_payload("  ", None, None, false);
        assert_eq!(p["question"], "initialize");
        assert_eq!(p["reset_conversation"], true);
        assert!(p.get("force_new_session").is_none());
        assert!(p["case_id"].as_str().unwrap().starts_with("case_"));
    }

    #[test]
    fn test_step_and_collected_data() {
        let mut ctx = ChatContext::murder_intake(true);
        ctx.crime_date = Some("2025-01-01".into());
        ctx.collected_data.insert("case_id".into(), "MC-1".into());
        ctx.collected_data.insert("date_of_crime".into(), "2025-02-02".into());

        let p = murder_payload("MC-1", Some(&ctx), None, false);
        assert!(p.get("current_step").is_none());
        // collectedData 覆盖上下文字段
        assert_eq!(p["date_of_crime"], "2025-02-02");

        ctx.current_step = Some(IntakeState::Collecting(CaseField::AdditionalNotes));
        let p = murder_payload("none", Some(&ctx), None, false);
        assert_eq!(p["current_step"], "additional_notes");
        assert!(is_analysis_step(&p));
        assert_eq!(p["case_id"], "MC-1");
    }
}
