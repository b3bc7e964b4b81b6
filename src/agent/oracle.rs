//! 判定预言机：完成判定与任务新颖性判定
//!
//! 一次性模型调用 + 固定指令，回复里含大小写不敏感的 "yes" 即为真；
//! 其余一切（含空串、含糊其辞、传输错误）都判否。这是启发式，不提供更强保证。

use std::sync::Arc;

use crate::llm::{LlmClient, Message};

const COMPLETION_INSTRUCTION: &str =
    "Given a task and an answer to the task, answer YES if the question/task was accomplished, answer NO if not.";

const NOVELTY_INSTRUCTION: &str =
    "Compare the two given tasks and answer YES if the task is semantically different.";

/// 一次性 YES/NO 判定器
pub struct Oracle {
    client: Arc<dyn LlmClient>,
    instruction: &'static str,
}

impl Oracle {
    /// 完成判定实例
    pub fn completion(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            instruction: COMPLETION_INSTRUCTION,
        }
    }

    /// 任务新颖性判定实例（防委派死循环）
    pub fn novelty(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            instruction: NOVELTY_INSTRUCTION,
        }
    }

    /// 单次判定：固定指令 + turns，回复含 "yes"（不分大小写）即真
    pub async fn judge(&self, turns: Vec<Message>) -> bool {
        let mut messages = vec![Message::system(self.instruction)];
        messages.extend(turns);
        match self.client.complete(&messages).await {
            Ok(reply) => reply.to_lowercase().contains("yes"),
            Err(e) => {
                tracing::warn!(error = %e, "oracle call failed, judging NO");
                false
            }
        }
    }

    /// 任务是否已完成：task 为 user，历次答案为 assistant
    pub async fn is_complete(&self, task: &str, answers: &[String]) -> bool {
        let mut turns = vec![Message::user(task)];
        turns.extend(answers.iter().map(Message::assistant));
        self.judge(turns).await
    }

    /// 转发任务与当前任务是否语义不同
    pub async fn differs(&self, task: &str, other_task: &str) -> bool {
        self.judge(vec![Message::user(task), Message::assistant(other_task)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    async fn judge_reply(reply: &str) -> bool {
        let oracle = Oracle::completion(Arc::new(MockLlmClient::with_replies([reply])));
        oracle.is_complete("task", &["answer".to_string()]).await
    }

    #[tokio::test]
    async fn test_yes_substring_is_true() {
        assert!(judge_reply("Yes, done.").await);
        assert!(judge_reply("YES").await);
        assert!(judge_reply("well... yes I think").await);
    }

    #[tokio::test]
    async fn test_anything_else_is_false() {
        assert!(!judge_reply("No").await);
        assert!(!judge_reply("maybe").await);
        assert!(!judge_reply("").await);
    }

    #[tokio::test]
    async fn test_transport_error_is_false() {
        let client = MockLlmClient::new();
        client.push_error("boom");
        let oracle = Oracle::novelty(Arc::new(client));
        assert!(!oracle.differs("a", "b").await);
    }
}
