//! Agent 错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：解析失败时生成纠正性重试提示，其余错误直接终止本次 ask。

use thiserror::Error;

/// ask 循环中可能出现的错误（解析、工具、取消）
///
/// 模型传输错误不在此列：Gateway 将其降级为哨兵文本 `[LLM error: ...]`，
/// 上游按一次格式错误的回复处理。
#[derive(Error, Debug)]
pub enum AgentError {
    /// 模型回复无法解析为 Decision（结构非法、缺键、未知收件人标签）
    #[error("Malformed decision: {0}")]
    MalformedDecision(String),

    /// 纠正重试预算耗尽，携带最后一条原始回复
    #[error("Parse retries exhausted after {attempts} attempts, last reply: {last}")]
    ParseRetriesExhausted { attempts: usize, last: String },

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    /// 用户中断（Ctrl+C），由上层转为干净退出
    #[error("Cancelled")]
    Cancelled,
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone)]
pub enum RecoveryAction {
    /// 将提示注入下一轮，让模型重试（格式错误的回复）
    RetryWithPrompt(String),
    /// 终止当前 ask
    Abort,
}
