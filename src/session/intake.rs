//! 凶案信息采集状态机
//!
//! `greeting -> collecting(field)* -> analysis_pending -> analysis_complete`。
//! 状态用标签联合表示，迁移是纯函数 [`transition`]，不做任何 I/O。
//! 步骤名即「正在等待的字段」，与远端服务的 current_step 字符串一一对应。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 采集的案件字段（按提问顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseField {
    CaseId,
    DateOfCrime,
    TimeOfCrime,
    Location,
    VictimName,
    VictimAge,
    VictimGender,
    CauseOfDeath,
    WeaponUsed,
    CrimeSceneDescription,
    Witnesses,
    EvidenceFound,
    Suspects,
    AdditionalNotes,
}

impl CaseField {
    pub const ALL: [CaseField; 14] = [
        CaseField::CaseId,
        CaseField::DateOfCrime,
        CaseField::TimeOfCrime,
        CaseField::Location,
        CaseField::VictimName,
        CaseField::VictimAge,
        CaseField::VictimGender,
        CaseField::CauseOfDeath,
        CaseField::WeaponUsed,
        CaseField::CrimeSceneDescription,
        CaseField::Witnesses,
        CaseField::EvidenceFound,
        CaseField::Suspects,
        CaseField::AdditionalNotes,
    ];

    /// collectedData 中的键，同时也是步骤名
    pub fn key(self) -> &'static str {
        match self {
            CaseField::CaseId => "case_id",
            CaseField::DateOfCrime => "date_of_crime",
            CaseField::TimeOfCrime => "time_of_crime",
            CaseField::Location => "location",
            CaseField::VictimName => "victim_name",
            CaseField::VictimAge => "victim_age",
            CaseField::VictimGender => "victim_gender",
            CaseField::CauseOfDeath => "cause_of_death",
            CaseField::WeaponUsed => "weapon_used",
            CaseField::CrimeSceneDescription => "crime_scene_description",
            CaseField::Witnesses => "witnesses",
            CaseField::EvidenceFound => "evidence_found",
            CaseField::Suspects => "suspects",
            CaseField::AdditionalNotes => "additional_notes",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn next(self) -> Option<Self> {
        let idx = Self::ALL.iter().position(|f| *f == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    /// 询问该字段的提示语
    pub fn prompt(self) -> &'static str {
        match self {
            CaseField::CaseId => "What is the Case ID for this investigation?",
            CaseField::DateOfCrime => {
                "Thank you. When did the crime occur? Please provide the date (YYYY-MM-DD)."
            }
            CaseField::TimeOfCrime => {
                "What time did the crime occur? (HH:MM format, or approximate time)"
            }
            CaseField::Location => "Where did the crime take place? Please provide the location.",
            CaseField::VictimName => "What is the victim's name?",
            CaseField::VictimAge => "What is the victim's age?",
            CaseField::VictimGender => "What is the victim's gender?",
            CaseField::CauseOfDeath => "What was the cause of death?",
            CaseField::WeaponUsed => "Was a weapon used? If so, what kind?",
            CaseField::CrimeSceneDescription => "Please describe the crime scene.",
            CaseField::Witnesses => "Were there any witnesses? If so, please provide details.",
            CaseField::EvidenceFound => "What evidence was found at the scene?",
            CaseField::Suspects => "Are there any suspects at this time?",
            CaseField::AdditionalNotes => {
                "Do you have any additional notes or information about the case?"
            }
        }
    }
}

/// 所有字段采集完毕后的确认语
pub const COLLECTION_COMPLETE: &str = "Thank you for providing all the case details. I'll now analyze this information and provide you with a comprehensive report.";

/// 采集状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum IntakeState {
    #[default]
    Greeting,
    Collecting(CaseField),
    AnalysisPending,
    AnalysisComplete,
}

/// 驱动状态机的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeEvent {
    /// 用户回复（含继续分析信号）
    UserReply,
    /// 远端分析已送达
    AnalysisDelivered,
    /// 远端分析超时
    AnalysisTimedOut,
    /// 远端分析失败（非超时），已用本地分析替代
    AnalysisFailed,
    /// 远端报告了已知步骤
    RemoteStep(IntakeState),
    Reset,
}

impl IntakeState {
    pub fn step_name(&self) -> &'static str {
        match self {
            IntakeState::Greeting => "greeting",
            IntakeState::Collecting(field) => field.key(),
            IntakeState::AnalysisPending => "analysis_pending",
            IntakeState::AnalysisComplete => "analysis_complete",
        }
    }

    /// 解析步骤名；远端的 "analysis" 视为分析完成
    pub fn from_step_name(name: &str) -> Option<Self> {
        match name {
            "greeting" => Some(IntakeState::Greeting),
            "analysis_pending" => Some(IntakeState::AnalysisPending),
            "analysis" | "analysis_complete" => Some(IntakeState::AnalysisComplete),
            other => CaseField::from_key(other).map(IntakeState::Collecting),
        }
    }

    /// 当前用户回复要填入的字段；greeting 之后的第一条消息即案件编号
    pub fn awaited_field(&self) -> Option<CaseField> {
        match self {
            IntakeState::Greeting => Some(CaseField::CaseId),
            IntakeState::Collecting(field) => Some(*field),
            _ => None,
        }
    }

    pub fn is_collecting_info(&self) -> bool {
        !matches!(self, IntakeState::AnalysisComplete)
    }

    /// 本轮用户消息是否会触发分析
    pub fn triggers_analysis(&self) -> bool {
        matches!(
            self,
            IntakeState::Collecting(CaseField::AdditionalNotes) | IntakeState::AnalysisPending
        )
    }

    /// 进入该状态后向用户展示的提示
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            IntakeState::Collecting(field) => Some(field.prompt()),
            IntakeState::AnalysisPending => Some(COLLECTION_COMPLETE),
            _ => None,
        }
    }
}

impl fmt::Display for IntakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.step_name())
    }
}

impl From<IntakeState> for String {
    fn from(state: IntakeState) -> Self {
        state.step_name().to_string()
    }
}

impl TryFrom<String> for IntakeState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        IntakeState::from_step_name(&value).ok_or_else(|| format!("unknown step: {}", value))
    }
}

/// 纯迁移函数
pub fn transition(state: IntakeState, event: &IntakeEvent) -> IntakeState {
    use IntakeState::*;

    match (state, event) {
        (_, IntakeEvent::Reset) => Greeting,
        (_, IntakeEvent::RemoteStep(remote)) => *remote,

        (Greeting, IntakeEvent::UserReply) => CaseField::CaseId
            .next()
            .map(Collecting)
            .unwrap_or(AnalysisPending),
        (Collecting(field), IntakeEvent::UserReply) => {
            field.next().map(Collecting).unwrap_or(AnalysisPending)
        }
        (AnalysisPending, IntakeEvent::UserReply) => AnalysisPending,
        (AnalysisComplete, IntakeEvent::UserReply) => AnalysisComplete,

        (AnalysisPending, IntakeEvent::AnalysisDelivered)
        | (AnalysisPending, IntakeEvent::AnalysisFailed) => AnalysisComplete,
        (AnalysisPending, IntakeEvent::AnalysisTimedOut) => AnalysisPending,

        (s, _) => s,
    }
}

/// 是否为「继续分析」信号
pub fn is_continue_signal(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("continue") || lower.contains("analyze")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(state: IntakeState) -> IntakeState {
        transition(state, &IntakeEvent::UserReply)
    }

    #[test]
    fn test_full_walk_reaches_analysis_pending() {
        let mut state = IntakeState::Greeting;
        assert_eq!(state.awaited_field(), Some(CaseField::CaseId));

        state = reply(state);
        assert_eq!(state, IntakeState::Collecting(CaseField::DateOfCrime));

        // date_of_crime .. additional_notes
        for _ in 0..13 {
            assert!(state.awaited_field().is_some());
            state = reply(state);
        }
        assert_eq!(state, IntakeState::AnalysisPending);
        assert_eq!(state.prompt(), Some(COLLECTION_COMPLETE));
    }

    #[test]
    fn test_analysis_outcomes() {
        let pending = IntakeState::AnalysisPending;
        assert_eq!(reply(pending), pending);
        assert_eq!(
            transition(pending, &IntakeEvent::AnalysisTimedOut),
            IntakeState::AnalysisPending
        );
        assert_eq!(
            transition(pending, &IntakeEvent::AnalysisDelivered),
            IntakeState::AnalysisComplete
        );
        assert_eq!(
            transition(pending, &IntakeEvent::AnalysisFailed),
            IntakeState::AnalysisComplete
        );
        assert_eq!(
            reply(IntakeState::AnalysisComplete),
            IntakeState::AnalysisComplete
        );
    }

    #[test]
    fn test_analysis_events_ignored_while_collecting() {
        let state = IntakeState::Collecting(CaseField::Location);
        assert_eq!(transition(state, &IntakeEvent::AnalysisDelivered), state);
    }

    #[test]
    fn test_reset_and_remote_step() {
        let state = IntakeState::Collecting(CaseField::Suspects);
        assert_eq!(transition(state, &IntakeEvent::Reset), IntakeState::Greeting);
        let remote = IntakeState::Collecting(CaseField::Witnesses);
        assert_eq!(transition(state, &IntakeEvent::RemoteStep(remote)), remote);
    }

    #[test]
    fn test_step_names() {
        for field in CaseField::ALL {
            let state = IntakeState::Collecting(field);
            assert_eq!(IntakeState::from_step_name(state.step_name()), Some(state));
        }
        assert_eq!(
            IntakeState::from_step_name("analysis"),
            Some(IntakeState::AnalysisComplete)
        );
        assert_eq!(IntakeState::from_step_name("lunch"), None);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&IntakeState::Collecting(CaseField::VictimAge)).unwrap();
        assert_eq!(json, "\"victim_age\"");
        let back: IntakeState = serde_json::from_str("\"analysis_pending\"").unwrap();
        assert_eq!(back, IntakeState::AnalysisPending);
        assert!(serde_json::from_str::<IntakeState>("\"nope\"").is_err());
    }

    #[test]
    fn test_continue_signal() {
        assert!(is_continue_signal("Please CONTINUE"));
        assert!(is_continue_signal("analyze it"));
        assert!(!is_continue_signal("hello"));
    }
}
