//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按队列吐出预置回复（可含传输错误），队列空时回显最后一条 User 消息为
//! caller 决策，便于无 Key 环境跑通分发循环。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

/// Mock 客户端：先吐预置回复，再回显
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一串回复，按顺序吐出
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    /// 预置一次传输错误（测试 Gateway 哨兵路径）
    pub fn push_error(&self, error: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Err(error.into()));
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Some(scripted) = self.replies.lock().unwrap().pop_front() {
            return scripted;
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!(
            r#"{{"recipient": "caller", "content": "Echo from Mock: {}"}}"#,
            last_user
        ))
    }
}
