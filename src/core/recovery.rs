//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction，供 ask 循环决定是带提示重试还是终止。

use crate::core::{AgentError, RecoveryAction};

/// 语义化错误恢复：将错误映射为可执行动作
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &AgentError) -> RecoveryAction {
        match err {
            AgentError::MalformedDecision(detail) => RecoveryAction::RetryWithPrompt(format!(
                "Your last reply could not be parsed: {detail}. \
                Reply with exactly one JSON object of the form \
                {{\"recipient\": \"...\", \"content\": \"...\"}} \
                (or a tool-call list whose function names are valid recipients). \
                Valid recipients: self, caller, clear, eval, exec, compact, ask_user, agent:<name>. \
                Output only the JSON, no markdown or prose."
            )),
            _ => RecoveryAction::Abort,
        }
    }
}
