//! 分发循环集成测试：脚本化 Mock 驱动完整 ask 流程

use std::sync::Arc;

use hive::agent::{Agent, AgentBudgets};
use hive::core::AgentError;
use hive::llm::{MockLlmClient, Role};
use hive::tools::{ToolExecutor, ToolRegistry};

fn build_agent(replies: Vec<&str>, budgets: AgentBudgets) -> Agent {
    let client = Arc::new(MockLlmClient::with_replies(replies));
    let executor = Arc::new(ToolExecutor::new(ToolRegistry::new(), 5));
    Agent::new("general_reasoning_agent", client, executor, budgets)
}

#[tokio::test]
async fn test_echo_hello_scenario() {
    // self("hello") → caller("hello") → 完成判定 "Yes, done."
    let mut agent = build_agent(
        vec![
            r#"{"recipient": "self", "content": "hello"}"#,
            r#"{"recipient": "caller", "content": "hello"}"#,
            "Yes, done.",
        ],
        AgentBudgets::default(),
    );

    let result = agent.ask("echo hello").await.unwrap();
    assert_eq!(result, "hello");

    // self 决策以 assistant 角色、原文内容进入历史
    let self_turn = agent
        .history()
        .iter()
        .find(|m| m.role == Role::Assistant && m.content == "hello")
        .expect("self message should be in history");
    assert_eq!(self_turn.content, "hello");
}

#[tokio::test]
async fn test_malformed_reply_is_corrected_then_processed() {
    // 第一条回复不可解析 → 纠正提示重发 → 第二条正常
    let mut agent = build_agent(
        vec![
            "I will get right to it.",
            r#"{"recipient": "caller", "content": "fixed"}"#,
            "Yes.",
        ],
        AgentBudgets::default(),
    );

    let result = agent.ask("do something").await.unwrap();
    assert_eq!(result, "fixed");

    // 纠正提示作为 user 回合进入了历史
    assert!(agent
        .history()
        .iter()
        .any(|m| m.role == Role::User && m.content.contains("could not be parsed")));
}

#[tokio::test]
async fn test_parse_retries_exhausted_is_terminal() {
    let budgets = AgentBudgets {
        max_parse_retries: 2,
        ..AgentBudgets::default()
    };
    let mut agent = build_agent(vec!["garbage", "more garbage", "still garbage"], budgets);

    let err = agent.ask("task").await.unwrap_err();
    match err {
        AgentError::ParseRetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(last.contains("garbage"));
        }
        other => panic!("expected ParseRetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_eval_division_by_zero_becomes_error_text() {
    let mut agent = build_agent(
        vec![
            r#"{"recipient": "eval", "content": "1/0"}"#,
            r#"{"recipient": "caller", "content": "gave up"}"#,
            "Yes.",
        ],
        AgentBudgets::default(),
    );

    let result = agent.ask("divide").await.unwrap();
    assert_eq!(result, "gave up");

    // 错误文本包含失败的表达式原文与错误描述，并作为自消息回填
    let error_turn = agent
        .history()
        .iter()
        .find(|m| m.content.contains("division by zero"))
        .expect("eval error should be fed back");
    assert!(error_turn.content.contains("1/0"));
}

#[tokio::test]
async fn test_same_task_delegation_is_skipped() {
    // 委派一个语义相同的任务：新颖性判定 "No" → 替换为 Do it yourself
    let mut agent = build_agent(
        vec![
            r#"{"recipient": "agent_helper", "content": "echo hello"}"#,
            "No",
            r#"{"recipient": "caller", "content": "done"}"#,
            "Yes.",
        ],
        AgentBudgets::default(),
    );

    let result = agent.ask("echo hello").await.unwrap();
    assert_eq!(result, "done");
    assert!(agent.child_names().is_empty(), "no child should be spawned");
    assert!(agent
        .history()
        .iter()
        .any(|m| m.content.contains("Do it yourself")));
}

#[tokio::test]
async fn test_distinct_task_is_forwarded_to_child() {
    // 共享同一个脚本化客户端：父 Gateway → 新颖性 → 子 Gateway → 子完成判定 → 父 Gateway → 父完成判定
    let mut agent = build_agent(
        vec![
            r#"{"recipient": "agent:helper", "content": "compute the answer"}"#,
            "Yes, different",
            r#"{"recipient": "caller", "content": "42"}"#,
            "Yes.",
            r#"{"recipient": "caller", "content": "the answer is 42"}"#,
            "Yes.",
        ],
        AgentBudgets::default(),
    );

    let result = agent.ask("what is the answer").await.unwrap();
    assert_eq!(result, "the answer is 42");
    assert_eq!(agent.child_names(), vec!["helper".to_string()]);

    // 子代理的回答作为 assistant 自消息回到了父历史
    assert!(agent
        .history()
        .iter()
        .any(|m| m.role == Role::Assistant && m.content == "42"));
}

#[tokio::test]
async fn test_depth_budget_fails_closed() {
    let budgets = AgentBudgets {
        max_depth: 0,
        ..AgentBudgets::default()
    };
    let mut agent = build_agent(
        vec![
            r#"{"recipient": "agent:helper", "content": "something new"}"#,
            "Yes, different",
            r#"{"recipient": "caller", "content": "did it myself"}"#,
            "Yes.",
        ],
        budgets,
    );

    let result = agent.ask("task").await.unwrap();
    assert_eq!(result, "did it myself");
    assert!(agent.child_names().is_empty());
    assert!(agent
        .history()
        .iter()
        .any(|m| m.content.contains("delegation budget exceeded")));
}

#[tokio::test]
async fn test_round_budget_returns_accumulated_results() {
    let budgets = AgentBudgets {
        max_rounds: 1,
        ..AgentBudgets::default()
    };
    let mut agent = build_agent(
        vec![r#"{"recipient": "caller", "content": "partial"}"#, "No"],
        budgets,
    );

    let result = agent.ask("task").await.unwrap();
    assert_eq!(result, "partial");
}

#[tokio::test]
async fn test_caller_results_accumulate_in_arrival_order() {
    // tool-call 列表线格式：一条 assistant 回合产出两条决策
    let mut agent = build_agent(
        vec![
            r#"[
                {"id": "c1", "function": {"name": "caller", "arguments": "{\"content\": \"first\"}"}},
                {"id": "c2", "function": {"name": "caller", "arguments": "{\"content\": \"second\"}"}}
            ]"#,
            "Yes.",
        ],
        AgentBudgets::default(),
    );

    let result = agent.ask("enumerate").await.unwrap();
    assert_eq!(result, "first\nsecond");
}

#[tokio::test]
async fn test_clear_resets_history_and_loop_continues() {
    let mut agent = build_agent(
        vec![
            r#"{"recipient": "clear", "content": "ignored"}"#,
            "No",
            r#"{"recipient": "caller", "content": "after reset"}"#,
            "Yes.",
        ],
        AgentBudgets::default(),
    );

    let result = agent.ask("reset yourself").await.unwrap();
    assert_eq!(result, "after reset");
    // clear 之后原始任务不再出现在历史里
    assert!(!agent
        .history()
        .iter()
        .any(|m| m.content == "reset yourself"));
}

#[tokio::test]
async fn test_tool_call_eval_result_uses_tool_role() {
    let mut agent = build_agent(
        vec![
            r#"[{"id": "call_7", "function": {"name": "eval", "arguments": "{\"content\": \"2+3\"}"}}]"#,
            r#"{"recipient": "caller", "content": "5"}"#,
            "Yes.",
        ],
        AgentBudgets::default(),
    );

    let result = agent.ask("add").await.unwrap();
    assert_eq!(result, "5");

    let tool_turn = agent
        .history()
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("eval result should come back as a tool turn");
    assert_eq!(tool_turn.content, "5");
    assert_eq!(tool_turn.tool_call_id.as_deref(), Some("call_7"));
}

#[tokio::test]
async fn test_cancelled_token_unwinds_cleanly() {
    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();

    let client = Arc::new(MockLlmClient::new());
    let executor = Arc::new(ToolExecutor::new(ToolRegistry::new(), 5));
    let mut agent = Agent::new("root", client, executor, AgentBudgets::default())
        .with_cancel_token(token);

    let err = agent.ask("task").await.unwrap_err();
    assert!(matches!(err, AgentError::Cancelled));
}

#[tokio::test]
async fn test_no_input_source_for_ask_user() {
    let mut agent = build_agent(
        vec![
            r#"{"recipient": "ask_user", "content": "what color?"}"#,
            r#"{"recipient": "caller", "content": "unknown"}"#,
            "Yes.",
        ],
        AgentBudgets::default(),
    );

    let result = agent.ask("pick a color").await.unwrap();
    assert_eq!(result, "unknown");
    assert!(agent
        .history()
        .iter()
        .any(|m| m.content.contains("no interactive user available")));
}
