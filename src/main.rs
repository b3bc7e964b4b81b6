//! Hive - Rust 递归多智能体系统
//!
//! 入口：初始化日志与配置，组装工具注册表与根代理，运行彩色 REPL 主循环。

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use hive::agent::{Agent, AgentBudgets, StdinInput, COLOR_RESET};
use hive::config::{load_config, AppConfig};
use hive::core::{AgentError, ShutdownManager};
use hive::llm::create_llm_from_config;
use hive::tools::{
    ReadKnowledgeTool, RunScriptTool, RunShellTool, ScrapeTool, StoreKnowledgeTool, ToolExecutor,
    ToolRegistry, WebSearchTool,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hive::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    // 工作目录：配置 > 当前目录下的 workspace
    let workspace = cfg
        .app
        .workspace_root
        .clone()
        .unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("workspace")
        });
    std::fs::create_dir_all(&workspace).ok();

    let llm = create_llm_from_config(&cfg.llm);

    // 工具注册表在启动时构造一次，按引用进入代理树
    let mut tools = ToolRegistry::new();
    tools.register(RunShellTool::new(cfg.tools.exec_timeout_secs));
    tools.register(RunScriptTool::new(cfg.tools.exec_timeout_secs));
    let knowledge_path = workspace.join(&cfg.tools.knowledge_file);
    tools.register(StoreKnowledgeTool::new(&knowledge_path));
    tools.register(ReadKnowledgeTool::new(&knowledge_path));
    tools.register(ScrapeTool::new(
        cfg.tools.search.timeout_secs,
        cfg.tools.search.max_result_chars,
    ));
    tools.register(WebSearchTool::new(
        cfg.tools.search.timeout_secs,
        cfg.tools.search.max_results,
    ));
    let executor = Arc::new(ToolExecutor::new(tools, cfg.tools.tool_timeout_secs));

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let mut agent = Agent::new(
        &cfg.agent.root_name,
        llm,
        executor,
        AgentBudgets::from(&cfg.agent),
    )
    .with_input(Arc::new(StdinInput))
    .with_cancel_token(shutdown.token());

    let color = agent.color();
    println!("{color}Type your command (type 'exit' to quit):{COLOR_RESET}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        tokio::select! {
            _ = shutdown.wait_for_shutdown() => {
                println!();
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("stdin read failed")? else {
                    break; // EOF
                };
                let command = line.trim();
                if command.is_empty() {
                    continue;
                }
                if matches!(command.to_lowercase().as_str(), "exit" | "quit") {
                    break;
                }
                match agent.ask(command).await {
                    Ok(response) => println!("{color}{response}{COLOR_RESET}"),
                    Err(AgentError::Cancelled) => break,
                    Err(e) => eprintln!("{color}[Error: {e}]{COLOR_RESET}"),
                }
            }
        }
    }

    let (prompt, completion, total) = agent.token_usage();
    if total > 0 {
        tracing::info!(prompt, completion, total, "cumulative token usage");
    }
    println!("{color}Exiting.{COLOR_RESET}");
    Ok(())
}
