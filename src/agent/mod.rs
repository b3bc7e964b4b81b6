//! 代理层：Decision 解析、Router、判定预言机与 ask 主循环
//!
//! Agent 是实体：名字、配色、独占的会话 Gateway、两个预言机、惰性创建的
//! 子代理表与递归深度。子代理在首次被引用时创建，随父代理存续。

pub mod decision;
pub mod loop_;
pub mod oracle;
pub mod router;

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use decision::{parse_decisions, Decision, Recipient};
pub use oracle::Oracle;
pub use router::Outcome;

use crate::config::AgentSection;
use crate::core::RecoveryEngine;
use crate::llm::{Gateway, LlmClient};
use crate::tools::ToolExecutor;

/// 代理的 system prompt 模板；占位符在构造时替换
const AGENT_INSTRUCTIONS: &str = r#"
You are an agent in a multi agent system.
Your name is __AGENT_NAME__ and your parents are: __PARENTS__.
Your task is to execute tasks and answer questions.
You shall reason with logic and ensure that you have completed the given task.
You are encouraged to plan, subdivide any tasks and forward them to other agents.
These agents talk back to you, so you can reason with them, but they do not have your knowledge.
Ask precise questions or give precise instructions to other agents.
Do not repeat yourself too much, do not use stubs or placeholders.
ALWAYS CHECK the result of your work before you finish!

You output only in json format, sending a single message and status information.
{
    "sender": "AGENT",
    "recipient": RECIPIENT,
    "content": CONTENT
}

AGENT is your agent name.
CONTENT is the message to send to the recipient.
RECIPIENT is the target to send the message to, the only valid targets are:
- "self": send the message to yourself, you will be called again with this message.
- "agent:XXX": where XXX is the name of another agent, it will be called with this message.
Use other agents to delegate tasks, subdivide your problem into smaller tasks. Do not end in a loop.
- "caller": send the message to the agent that called you.
- "clear": ignore content and clear your history, should be requested by the user.
- "compact": replace your history with a short summary of it.
- "ask_user": ask the human user for input, the reply comes back to you.
- "eval": the content is a single expression, maybe calling the available functions.
- "exec": the content is a multi-line script of such expressions, print output is captured.
You can access the system using these functions but you do not have sudo rights.

The following functions are available:
___TOOL_FUNCTIONS___
"#;

/// ANSI 前景色列表，按名字哈希选取
const COLORS: &[&str] = &[
    "\x1b[32m", // Green
    "\x1b[34m", // Blue
    "\x1b[35m", // Magenta
    "\x1b[36m", // Cyan
    "\x1b[33m", // Yellow
    "\x1b[91m", // Light Red
    "\x1b[92m", // Light Green
    "\x1b[94m", // Light Blue
    "\x1b[95m", // Light Magenta
    "\x1b[96m", // Light Cyan
];

pub const COLOR_RESET: &str = "\x1b[0m";

/// 由名字稳定地导出展示色
pub fn agent_color(agent_name: &str) -> &'static str {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    agent_name.hash(&mut hasher);
    COLORS[(hasher.finish() % COLORS.len() as u64) as usize]
}

/// 循环与递归预算：三个上限共同保证活性
#[derive(Debug, Clone)]
pub struct AgentBudgets {
    /// 完成检查未通过时最多再循环的轮数
    pub max_rounds: usize,
    /// 单个 assistant 回合内的纠正重试上限
    pub max_parse_retries: usize,
    /// 子代理委派的最大递归深度
    pub max_depth: usize,
}

impl From<&AgentSection> for AgentBudgets {
    fn from(section: &AgentSection) -> Self {
        Self {
            max_rounds: section.max_rounds,
            max_parse_retries: section.max_parse_retries,
            max_depth: section.max_depth,
        }
    }
}

impl Default for AgentBudgets {
    fn default() -> Self {
        Self::from(&AgentSection::default())
    }
}

/// 人类输入源：ask_user 处理器的注入点（REPL 给 stdin，实现测试隔离）
#[async_trait]
pub trait UserInput: Send + Sync {
    async fn read_input(&self, prompt: &str) -> Result<String, String>;
}

/// 终端输入源
pub struct StdinInput;

#[async_trait]
impl UserInput for StdinInput {
    async fn read_input(&self, prompt: &str) -> Result<String, String> {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{}\n> ", prompt).as_bytes())
            .await
            .map_err(|e| e.to_string())?;
        stdout.flush().await.map_err(|e| e.to_string())?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| e.to_string())?;
        Ok(line.trim_end().to_string())
    }
}

/// 代理实体
pub struct Agent {
    pub(crate) name: String,
    /// 含所有父辈的点分长名，进日志与子代理 prompt
    pub(crate) long_name: String,
    pub(crate) color: &'static str,
    pub(crate) gateway: Gateway,
    pub(crate) finished: Oracle,
    pub(crate) novelty: Oracle,
    pub(crate) client: Arc<dyn LlmClient>,
    pub(crate) executor: Arc<ToolExecutor>,
    pub(crate) children: HashMap<String, Agent>,
    pub(crate) depth: usize,
    pub(crate) budgets: AgentBudgets,
    pub(crate) recovery: RecoveryEngine,
    pub(crate) input: Option<Arc<dyn UserInput>>,
    pub(crate) cancel: CancellationToken,
}

impl Agent {
    /// 创建根代理；子代理经由 Router 的委派分支惰性创建
    pub fn new(
        name: &str,
        client: Arc<dyn LlmClient>,
        executor: Arc<ToolExecutor>,
        budgets: AgentBudgets,
    ) -> Self {
        Self::with_parent(name, None, client, executor, budgets, CancellationToken::new(), None, 0)
    }

    /// 注入人类输入源（ask_user 处理器）
    pub fn with_input(mut self, input: Arc<dyn UserInput>) -> Self {
        self.input = Some(input);
        self
    }

    /// 注入取消令牌（Ctrl+C 优雅退出）
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[allow(clippy::too_many_arguments)]
    fn with_parent(
        name: &str,
        parent_long_name: Option<&str>,
        client: Arc<dyn LlmClient>,
        executor: Arc<ToolExecutor>,
        budgets: AgentBudgets,
        cancel: CancellationToken,
        input: Option<Arc<dyn UserInput>>,
        depth: usize,
    ) -> Self {
        let long_name = match parent_long_name {
            Some(parent) => format!("{parent}.{name}"),
            None => name.to_string(),
        };
        let prompt = AGENT_INSTRUCTIONS
            .replace("__AGENT_NAME__", name)
            .replace("__PARENTS__", parent_long_name.unwrap_or(""))
            .replace("___TOOL_FUNCTIONS___", &executor.prompt_section());

        Self {
            name: name.to_string(),
            color: agent_color(name),
            gateway: Gateway::new(client.clone(), prompt),
            finished: Oracle::completion(client.clone()),
            novelty: Oracle::novelty(client.clone()),
            client,
            executor,
            children: HashMap::new(),
            depth,
            budgets,
            recovery: RecoveryEngine::new(),
            input,
            cancel,
            long_name,
        }
    }

    /// 惰性创建子代理：继承客户端、工具、预算与输入源，深度 +1
    pub(crate) fn spawn_child(&self, name: &str) -> Agent {
        Agent::with_parent(
            name,
            Some(&self.long_name),
            self.client.clone(),
            self.executor.clone(),
            self.budgets.clone(),
            self.cancel.child_token(),
            self.input.clone(),
            self.depth + 1,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &'static str {
        self.color
    }

    /// 会话历史（测试与调试用）
    pub fn history(&self) -> &[crate::llm::Message] {
        self.gateway.history()
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.gateway.token_usage()
    }

    /// 已创建的子代理名（测试与调试用）
    pub fn child_names(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::tools::ToolRegistry;

    fn executor() -> Arc<ToolExecutor> {
        Arc::new(ToolExecutor::new(ToolRegistry::new(), 5))
    }

    #[test]
    fn test_color_is_stable() {
        assert_eq!(agent_color("helper"), agent_color("helper"));
    }

    #[test]
    fn test_prompt_contains_name_and_parents() {
        let client = Arc::new(MockLlmClient::new());
        let agent = Agent::new("root", client, executor(), AgentBudgets::default());
        let system = &agent.history()[0].content;
        assert!(system.contains("Your name is root"));

        let child = agent.spawn_child("worker");
        let system = &child.history()[0].content;
        assert!(system.contains("Your name is worker"));
        assert!(system.contains("parents are: root"));
        assert_eq!(child.depth, 1);
        assert_eq!(child.long_name, "root.worker");
    }
}
