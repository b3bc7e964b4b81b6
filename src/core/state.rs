//! ask 循环的阶段状态，用于日志与调试

use serde::Serialize;

/// 单次 ask 内的阶段：等模型 → 已分发 → 完成检查 → 结束
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Phase {
    AwaitingModel,
    Dispatched,
    CheckingCompletion,
    Done,
}
