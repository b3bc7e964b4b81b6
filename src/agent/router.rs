//! Router：对单条 Decision 的穷尽分发
//!
//! 处理器错误（eval/exec、子代理失败）一律转为错误文本回填为自消息，
//! 绝不冒泡到主循环；唯一的例外是取消，它要向上传播触发干净退出。

use crate::agent::{Agent, Decision, Recipient};
use crate::core::AgentError;
use crate::interp;
use crate::llm::Message;

/// 分发结果：新的自消息 / 调用方结果 / 无事发生
#[derive(Debug)]
pub enum Outcome {
    SelfMessage(Message),
    CallerResult(String),
    Silent,
}

/// 压缩摘要用的一次性指令
const SUMMARIZE_INSTRUCTION: &str =
    "Summarize the following conversation in a few sentences, keeping all facts, \
     decisions and open points that matter for continuing the task.";

impl Agent {
    /// 分发一条决策；task 是本次 ask 的原始任务（新颖性判定用）
    pub(crate) async fn dispatch(
        &mut self,
        decision: Decision,
        task: &str,
    ) -> Result<Outcome, AgentError> {
        let Decision {
            recipient,
            content,
            call_id,
        } = decision;

        match recipient {
            Recipient::SelfLoop => Ok(Outcome::SelfMessage(Message::assistant(content))),

            Recipient::Caller => {
                tracing::info!(agent = %self.long_name, "prepare message to caller: {}", preview(&content));
                Ok(Outcome::CallerResult(content))
            }

            Recipient::Clear => {
                self.gateway.clear_history();
                Ok(Outcome::Silent)
            }

            Recipient::Eval => {
                tracing::info!(agent = %self.long_name, "eval: {}", preview(&content));
                let text = match interp::evaluate(&content, &self.executor).await {
                    Ok(value) => value,
                    Err(e) => format!("[Error evaluating: {e} - {content}]"),
                };
                Ok(Outcome::SelfMessage(result_message(text, call_id)))
            }

            Recipient::Exec => {
                tracing::info!(agent = %self.long_name, "exec: {}", preview(&content));
                let text = match interp::execute(&content, &self.executor).await {
                    Ok(output) => output,
                    Err(e) => format!("[Error executing: {e} - {content}]"),
                };
                Ok(Outcome::SelfMessage(result_message(text, call_id)))
            }

            Recipient::Compact => {
                self.compact_history().await;
                Ok(Outcome::Silent)
            }

            Recipient::AskUser => {
                let message = match &self.input {
                    Some(input) => match input.read_input(&content).await {
                        Ok(reply) => Message::user(reply),
                        Err(e) => Message::user(format!("[Error reading user input: {e}]")),
                    },
                    None => Message::user("[no interactive user available]"),
                };
                Ok(Outcome::SelfMessage(message))
            }

            Recipient::Agent(name) if name == self.name => {
                Ok(Outcome::SelfMessage(Message::assistant(content)))
            }

            Recipient::Agent(name) => self.forward_to_child(&name, content, task).await,
        }
    }

    /// 委派分支：先问新颖性，再查深度预算，最后惰性建子代理并同步转发
    async fn forward_to_child(
        &mut self,
        name: &str,
        content: String,
        task: &str,
    ) -> Result<Outcome, AgentError> {
        if !self.novelty.differs(task, &content).await {
            return Ok(Outcome::SelfMessage(Message::user(format!(
                "Skipping message to {name} as it is not a new task. Do it yourself."
            ))));
        }

        if self.depth + 1 > self.budgets.max_depth {
            tracing::warn!(agent = %self.long_name, child = %name, "delegation depth budget exceeded");
            return Ok(Outcome::SelfMessage(Message::user(
                "[delegation budget exceeded - handle this task yourself]",
            )));
        }

        if !self.children.contains_key(name) {
            let child = self.spawn_child(name);
            self.children.insert(name.to_string(), child);
        }
        tracing::info!(
            agent = %self.long_name,
            "{}Forwarding message to {}: {}{}",
            self.color,
            name,
            preview(&content),
            crate::agent::COLOR_RESET
        );

        let Some(child) = self.children.get_mut(name) else {
            return Ok(Outcome::SelfMessage(Message::user(format!(
                "[Error: agent {name} unavailable]"
            ))));
        };
        match child.ask_task(content).await {
            Ok(response) => Ok(Outcome::SelfMessage(Message::assistant(response))),
            // 取消向上传播，其余子代理失败转为错误文本
            Err(AgentError::Cancelled) => Err(AgentError::Cancelled),
            Err(e) => Ok(Outcome::SelfMessage(Message::user(format!(
                "[Error from agent {name}: {e}]"
            )))),
        }
    }

    /// compact 处理器：一次摘要调用后替换历史；摘要失败则历史原样保留
    async fn compact_history(&mut self) {
        let transcript: String = self
            .gateway
            .history()
            .iter()
            .skip(1)
            .map(|m| format!("{:?}: {}\n", m.role, m.content))
            .collect();
        if transcript.is_empty() {
            return;
        }
        let request = vec![
            Message::system(SUMMARIZE_INSTRUCTION),
            Message::user(transcript),
        ];
        match self.client.complete(&request).await {
            Ok(summary) if !summary.trim().is_empty() => {
                self.gateway.compact(summary.trim());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(agent = %self.long_name, error = %e, "compaction failed, keeping history");
            }
        }
    }
}

/// eval/exec 结果回填：tool-call 来源带 id 时用 Tool 角色，否则 assistant
fn result_message(text: String, call_id: Option<String>) -> Message {
    match call_id {
        Some(id) => Message::tool(text, id),
        None => Message::assistant(text),
    }
}

/// 日志预览截断
fn preview(s: &str) -> String {
    const MAX: usize = 120;
    if s.chars().count() > MAX {
        format!("{}...", s.chars().take(MAX).collect::<String>())
    } else {
        s.to_string()
    }
}
