//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

/// [app] 段：应用名与工作目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 工作目录（知识文件等落在这里），未设置时用 ./workspace
    pub workspace_root: Option<PathBuf>,
}

/// [agent] 段：循环与递归预算
///
/// 三个预算共同保证活性：解析重试、完成检查轮数、委派递归深度都有上限，超限即收口返回。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 根代理名称
    #[serde(default = "default_root_name")]
    pub root_name: String,
    /// 完成检查未通过时最多再循环的轮数
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// 单个 assistant 回合内，格式错误回复的纠正重试上限
    #[serde(default = "default_max_parse_retries")]
    pub max_parse_retries: usize,
    /// 子代理委派的最大递归深度
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            root_name: default_root_name(),
            max_rounds: default_max_rounds(),
            max_parse_retries: default_max_parse_retries(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_root_name() -> String {
    "general_reasoning_agent".to_string()
}

fn default_max_rounds() -> usize {
    8
}

fn default_max_parse_retries() -> usize {
    3
}

fn default_max_depth() -> usize {
    4
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmSection {
    /// 后端：azure / openai；优先级由 API Key 与 provider 共同决定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub azure: LlmAzureSection,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
}

fn default_provider() -> String {
    "azure".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmAzureSection {
    /// 部署名，未设置时读 AZURE_OPENAI_DEPLOYMENT
    pub deployment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

/// [tools] 段：沙箱执行超时、知识文件、抓取/搜索参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// run_shell / run_script 的墙钟超时（秒）
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,
    /// 单次工具调用总超时（秒），由执行器施加
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// 知识文件名（相对工作目录）
    #[serde(default = "default_knowledge_file")]
    pub knowledge_file: String,
    #[serde(default)]
    pub search: SearchSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            exec_timeout_secs: default_exec_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            knowledge_file: default_knowledge_file(),
            search: SearchSection::default(),
        }
    }
}

fn default_exec_timeout_secs() -> u64 {
    10
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_knowledge_file() -> String {
    "permanent_knowledge.txt".to_string()
}

/// [tools.search] 段：抓取 URL 的超时、最大字符数、搜索结果条数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_result_chars")]
    pub max_result_chars: usize,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_search_timeout_secs(),
            max_result_chars: default_max_result_chars(),
            max_results: default_max_results(),
        }
    }
}

fn default_search_timeout_secs() -> u64 {
    10
}

fn default_max_result_chars() -> usize {
    8000
}

fn default_max_results() -> usize {
    3
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            agent: AgentSection::default(),
            tools: ToolsSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.root_name, "general_reasoning_agent");
        assert_eq!(cfg.agent.max_parse_retries, 3);
        assert_eq!(cfg.tools.exec_timeout_secs, 10);
        assert_eq!(cfg.tools.search.max_results, 3);
    }
}
