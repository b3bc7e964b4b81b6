//! Gateway：单个代理的会话历史与模型调用
//!
//! 历史仅追加（clear / compact 是显式例外），每个代理独占一个实例。
//! 传输错误不向上抛：降级为哨兵文本 `[LLM error: ...]`，调用方按一次格式错误的回复处理。

use std::sync::Arc;

use crate::llm::{LlmClient, Message};

/// 会话 Gateway：持有初始 system prompt、完整历史与共享客户端
pub struct Gateway {
    client: Arc<dyn LlmClient>,
    initial_prompt: String,
    history: Vec<Message>,
}

impl Gateway {
    pub fn new(client: Arc<dyn LlmClient>, initial_prompt: impl Into<String>) -> Self {
        let initial_prompt = initial_prompt.into();
        Self {
            history: vec![Message::system(initial_prompt.clone())],
            client,
            initial_prompt,
        }
    }

    /// 追加 turns 并请求一次补全；成功时回复也写入历史。
    /// 失败时返回哨兵文本，历史中不追加 assistant 回合。
    pub async fn ask(&mut self, turns: Vec<Message>) -> String {
        self.history.extend(turns);
        match self.client.complete(&self.history).await {
            Ok(content) => {
                self.history.push(Message::assistant(content.clone()));
                content
            }
            Err(e) => format!("[LLM error: {}]", e),
        }
    }

    /// 重置为仅剩初始 system 消息（数据丢弃是刻意的：作为显式复位信号使用）
    pub fn clear_history(&mut self) {
        self.history = vec![Message::system(self.initial_prompt.clone())];
    }

    /// 压缩：历史替换为 system + 一条摘要消息
    pub fn compact(&mut self, summary: &str) {
        self.history = vec![
            Message::system(self.initial_prompt.clone()),
            Message::assistant(format!("Summary of the conversation so far:\n{}", summary)),
        ];
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.client.token_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, Role};

    #[tokio::test]
    async fn test_ask_appends_turns_and_reply() {
        let client = Arc::new(MockLlmClient::with_replies(["pong"]));
        let mut gw = Gateway::new(client, "system prompt");
        let reply = gw.ask(vec![Message::user("ping")]).await;
        assert_eq!(reply, "pong");
        let h = gw.history();
        assert_eq!(h.len(), 3);
        assert_eq!(h[0].role, Role::System);
        assert_eq!(h[1].content, "ping");
        assert_eq!(h[2].content, "pong");
    }

    #[tokio::test]
    async fn test_transport_error_becomes_sentinel() {
        let client = MockLlmClient::new();
        client.push_error("connection refused");
        let mut gw = Gateway::new(Arc::new(client), "system prompt");
        let reply = gw.ask(vec![Message::user("ping")]).await;
        assert!(reply.starts_with("[LLM error:"));
        assert!(reply.contains("connection refused"));
        // 哨兵不写入历史
        assert_eq!(gw.history().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_history_leaves_single_system_message() {
        let client = Arc::new(MockLlmClient::with_replies(["a", "b"]));
        let mut gw = Gateway::new(client, "init");
        gw.ask(vec![Message::user("1")]).await;
        gw.ask(vec![Message::user("2")]).await;
        assert!(gw.history().len() > 1);
        gw.clear_history();
        assert_eq!(gw.history().len(), 1);
        assert_eq!(gw.history()[0].role, Role::System);
        assert_eq!(gw.history()[0].content, "init");
    }

    #[tokio::test]
    async fn test_compact_replaces_history_with_summary() {
        let client = Arc::new(MockLlmClient::with_replies(["a", "b"]));
        let mut gw = Gateway::new(client, "init");
        gw.ask(vec![Message::user("1")]).await;
        gw.ask(vec![Message::user("2")]).await;
        gw.compact("the gist");
        assert_eq!(gw.history().len(), 2);
        assert!(gw.history()[1].content.contains("the gist"));
    }
}
