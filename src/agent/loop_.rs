//! ask 主循环
//!
//! 有自消息就问模型：解析（格式错误时带纠正提示重试，有上限）→ 按序分发 →
//! 无自消息后做完成判定；未完成则注入督促指令再来一轮，轮数有上限。
//! 子代理同步递归调用同一循环，调用图是深度优先的树。

use futures_util::future::BoxFuture;

use crate::agent::{parse_decisions, Agent, Outcome};
use crate::core::{AgentError, Phase, RecoveryAction};
use crate::llm::Message;

/// 完成判定未通过时注入的督促指令
const CORRECTIVE_INSTRUCTION: &str =
    "The task is not complete. Try harder and find answers yourself. \
     Make a plan, use the internet, delegate tasks. Dont go in circles.";

impl Agent {
    /// 处理一个任务直到完成判定通过或预算耗尽，返回给调用方的结果
    pub async fn ask(&mut self, task: &str) -> Result<String, AgentError> {
        self.ask_task(task.to_string()).await
    }

    /// 递归入口（子代理转发走这里），异步递归需要 BoxFuture
    pub(crate) fn ask_task(&mut self, task: String) -> BoxFuture<'_, Result<String, AgentError>> {
        Box::pin(async move {
            let mut pending = Some(Message::user(task.clone()));
            let mut caller_results: Vec<String> = Vec::new();
            let mut rounds = 0usize;

            loop {
                while let Some(message) = pending.take() {
                    if self.cancel.is_cancelled() {
                        tracing::info!(agent = %self.long_name, "cancelled, unwinding");
                        return Err(AgentError::Cancelled);
                    }

                    tracing::debug!(agent = %self.long_name, phase = ?Phase::AwaitingModel);
                    let mut raw = self.gateway.ask(vec![message]).await;

                    // 解析；格式错误（含 Gateway 哨兵）时带纠正提示重试，重试次数有上限
                    let decisions = {
                        let mut attempts = 0usize;
                        loop {
                            match parse_decisions(&raw, &self.name) {
                                Ok(decisions) => break decisions,
                                Err(e) => {
                                    attempts += 1;
                                    if attempts > self.budgets.max_parse_retries {
                                        return Err(AgentError::ParseRetriesExhausted {
                                            attempts,
                                            last: raw,
                                        });
                                    }
                                    match self.recovery.handle(&e) {
                                        RecoveryAction::RetryWithPrompt(prompt) => {
                                            tracing::warn!(
                                                agent = %self.long_name,
                                                attempt = attempts,
                                                error = %e,
                                                "malformed decision, re-prompting"
                                            );
                                            raw = self.gateway.ask(vec![Message::user(prompt)]).await;
                                        }
                                        RecoveryAction::Abort => return Err(e),
                                    }
                                }
                            }
                        }
                    };

                    tracing::debug!(agent = %self.long_name, phase = ?Phase::Dispatched, count = decisions.len());
                    // 同一回合的多个决策严格按到达顺序处理；后写的自消息覆盖前者
                    for decision in decisions {
                        match self.dispatch(decision, &task).await? {
                            Outcome::SelfMessage(message) => {
                                tracing::info!(
                                    agent = %self.long_name,
                                    "message to self: {}",
                                    message.content.chars().take(120).collect::<String>()
                                );
                                pending = Some(message);
                            }
                            Outcome::CallerResult(content) => caller_results.push(content),
                            Outcome::Silent => {}
                        }
                    }
                }

                tracing::debug!(agent = %self.long_name, phase = ?Phase::CheckingCompletion);
                if self.finished.is_complete(&task, &caller_results).await {
                    tracing::info!(
                        agent = %self.long_name,
                        phase = ?Phase::Done,
                        "{}Task accomplished, returning to caller{}",
                        self.color,
                        crate::agent::COLOR_RESET
                    );
                    return Ok(caller_results.join("\n"));
                }

                rounds += 1;
                if rounds >= self.budgets.max_rounds {
                    tracing::warn!(
                        agent = %self.long_name,
                        rounds,
                        "round budget exhausted before completion"
                    );
                    if caller_results.is_empty() {
                        return Ok(format!(
                            "[round budget exhausted after {rounds} rounds with no result]"
                        ));
                    }
                    return Ok(caller_results.join("\n"));
                }

                tracing::info!(agent = %self.long_name, "not complete, adding corrective instruction");
                pending = Some(Message::user(CORRECTIVE_INSTRUCTION));
            }
        })
    }
}
