//! 凶案案件采集流程
//!
//! 每条用户消息先按本地状态机记录并推进，再交给远端凶案服务；远端可用时采用其回复与已知步骤，
//! 远端不可用时按本地状态继续提问，分析阶段失败则生成本地分析报告。

use std::sync::Arc;

use crate::chat::ChatContext;
use crate::proxy::fallback::murder_case_analysis;
use crate::proxy::murder::{case_data, ANALYSIS_TIMEOUT_MESSAGE};
use crate::proxy::payload::{CONTINUE_ANALYSIS, FORCE_NEW_SESSION};
use crate::proxy::{MurderChannel, MurderRequest};
use crate::resolve::templates;
use crate::session::intake::{
    is_continue_signal, transition, CaseField, IntakeEvent, IntakeState, COLLECTION_COMPLETE,
};

pub const LIVE_MARKER: &str = "**[LIVE DATA ANALYSIS]**\n\n";

const GREETING: &str = "Hello, I'm the Murder Agent, an AI assistant specialized in homicide investigations. I'll help you analyze a murder case by collecting relevant information. Let's start with the basics. What is the Case ID for this investigation?";

/// 一轮采集的结果
#[derive(Debug, Clone)]
pub struct IntakeTurn {
    pub reply: String,
    pub context: ChatContext,
}

pub struct IntakeFlow {
    channel: Option<Arc<dyn MurderChannel>>,
}

impl IntakeFlow {
    /// channel 为 None 时完全本地运行
    pub fn new(channel: Option<Arc<dyn MurderChannel>>) -> Self {
        Self { channel }
    }

    pub fn local() -> Self {
        Self { channel: None }
    }

    pub fn is_live(&self) -> bool {
        self.channel.is_some()
    }

    pub fn greeting(&self) -> String {
        if self.is_live() {
            format!("{}{}", LIVE_MARKER, GREETING)
        } else {
            GREETING.to_string()
        }
    }

    /// 发往远端的问题：分析待定阶段的继续信号改写为 CONTINUE_ANALYSIS
    pub fn wire_question(state: IntakeState, message: &str) -> String {
        if state == IntakeState::AnalysisPending && is_continue_signal(message) {
            CONTINUE_ANALYSIS.to_string()
        } else {
            message.to_string()
        }
    }

    pub async fn respond(&self, message: &str, mut context: ChatContext) -> IntakeTurn {
        let state = context.intake_state();
        let answer = message.trim();

        if let Some(field) = state.awaited_field() {
            context
                .collected_data
                .insert(field.key().to_string(), answer.to_string());
            if field == CaseField::CaseId && context.case_id.is_none() {
                context.case_id = Some(answer.to_string());
            }
        }
        let local_next = transition(state, &IntakeEvent::UserReply);

        let (reply, next) = match &self.channel {
            Some(channel) => self.exchange(channel.as_ref(), state, local_next, message, &mut context).await,
            None => self.local_turn(state, local_next, message, &context),
        };

        context.current_step = Some(next);
        context.is_collecting_info = next.is_collecting_info();
        context.using_live_backend = self.is_live();
        tracing::debug!("Murder intake {} -> {}", state, next);

        IntakeTurn { reply, context }
    }

    async fn exchange(
        &self,
        channel: &dyn MurderChannel,
        state: IntakeState,
        local_next: IntakeState,
        message: &str,
        context: &mut ChatContext,
    ) -> (String, IntakeState) {
        // 发送时带回复前的步骤，服务端据此知道这条回复对应哪个字段
        let mut outgoing = context.clone();
        outgoing.current_step = Some(state);
        let request = MurderRequest::new(Self::wire_question(state, message))
            .with_session(context.session_id.clone())
            .with_context(Some(outgoing));

        match channel.exchange(&request).await {
            Ok(reply) => {
                if reply.session_id.is_some() {
                    context.session_id = reply.session_id.clone();
                }
                for (k, v) in reply.collected_data {
                    context.collected_data.insert(k, v);
                }
                let next = match reply
                    .current_step
                    .as_deref()
                    .and_then(IntakeState::from_step_name)
                {
                    Some(remote) => transition(local_next, &IntakeEvent::RemoteStep(remote)),
                    None if state.triggers_analysis() => {
                        transition(IntakeState::AnalysisPending, &IntakeEvent::AnalysisDelivered)
                    }
                    None => local_next,
                };
                (reply.response, next)
            }
            Err(e) if e.is_timeout() && state.triggers_analysis() => {
                tracing::warn!("Murder analysis timed out: {}", e);
                (
                    ANALYSIS_TIMEOUT_MESSAGE.to_string(),
                    transition(IntakeState::AnalysisPending, &IntakeEvent::AnalysisTimedOut),
                )
            }
            Err(e) if state.triggers_analysis() => {
                tracing::warn!("Murder analysis failed, generating locally: {}", e);
                (
                    murder_case_analysis(&case_data(context)),
                    transition(IntakeState::AnalysisPending, &IntakeEvent::AnalysisFailed),
                )
            }
            Err(e) => {
                tracing::warn!("Murder backend unavailable, continuing locally: {}", e);
                self.local_turn(state, local_next, message, context)
            }
        }
    }

    fn local_turn(
        &self,
        state: IntakeState,
        local_next: IntakeState,
        message: &str,
        context: &ChatContext,
    ) -> (String, IntakeState) {
        if state.triggers_analysis() {
            let analysis = murder_case_analysis(&case_data(context));
            return (
                format!("{}\n\n{}", COLLECTION_COMPLETE, analysis),
                transition(IntakeState::AnalysisPending, &IntakeEvent::AnalysisFailed),
            );
        }
        if state == IntakeState::AnalysisComplete {
            return (
                templates::generate("murder", message, Some(context)),
                IntakeState::AnalysisComplete,
            );
        }
        let prompt = local_next.prompt().unwrap_or(COLLECTION_COMPLETE);
        (prompt.to_string(), local_next)
    }

    /// 新会话：清空上下文，远端尽力重置并记录新会话 id
    pub async fn reset(&self) -> IntakeTurn {
        let mut context = ChatContext::murder_intake(self.is_live());
        context.current_step = Some(transition(
            context.intake_state(),
            &IntakeEvent::Reset,
        ));

        if let Some(channel) = &self.channel {
            let request = MurderRequest::new(FORCE_NEW_SESSION).force_reset();
            match channel.exchange(&request).await {
                Ok(reply) => context.session_id = reply.session_id,
                Err(e) => tracing::warn!("Murder session reset failed: {}", e),
            }
        }

        IntakeTurn {
            reply: self.greeting(),
            context,
        }
    }
}
