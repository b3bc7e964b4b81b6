//! Hive - Rust 递归多智能体系统
//!
//! 模块划分：
//! - **agent**: 决策分发循环（Decision 解析、Router、完成判定、子代理树）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、阶段状态、优雅关闭
//! - **interp**: 能力受限的表达式/脚本解释器（eval / exec 处理器的后端）
//! - **llm**: 模型客户端抽象与实现（OpenAI 兼容 / Azure / Mock）与会话 Gateway
//! - **tools**: 工具箱（run_shell、run_script、knowledge、scrape、search）与执行器

pub mod agent;
pub mod config;
pub mod core;
pub mod interp;
pub mod llm;
pub mod observability;
pub mod tools;
