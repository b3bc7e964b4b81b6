//! run_shell 工具：bash 命令沙箱执行
//!
//! 命令先落地为临时 .sh 再交给 bash（直接 -c 时引号与特殊字符容易出问题），
//! 固定墙钟超时，输出结构化 JSON：{stdout, stderr, returncode, success}。

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::sandbox::run_in_sandbox;
use crate::tools::Tool;

pub struct RunShellTool {
    timeout_secs: u64,
}

impl RunShellTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[async_trait]
impl Tool for RunShellTool {
    fn name(&self) -> &str {
        "run_shell"
    }

    fn description(&self) -> &str {
        "Execute a bash command and return structured output (stdout, stderr, returncode, success). \
         Bash does not handle quotes and special characters very well, maybe use run_script for this. \
         No sudo rights."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The bash command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if command.is_empty() {
            return Err("Missing command".to_string());
        }

        tracing::info!(command = %command, "run_shell");
        let result = run_in_sandbox("bash", ".sh", command, self.timeout_secs).await;
        Ok(result.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_shell_structured_output() {
        let tool = RunShellTool::new(5);
        let out = tool
            .execute(serde_json::json!({"command": "echo hi"}))
            .await
            .unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["returncode"], 0);
        assert_eq!(v["stdout"].as_str().unwrap().trim(), "hi");
    }

    #[tokio::test]
    async fn test_run_shell_missing_command() {
        let tool = RunShellTool::new(5);
        assert!(tool.execute(serde_json::json!({})).await.is_err());
    }
}
