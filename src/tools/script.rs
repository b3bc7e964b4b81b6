//! run_script 工具：Python 代码沙箱执行
//!
//! 与 run_shell 同一契约：临时 .py 文件 + 超时 + 结构化 JSON 结果。

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::sandbox::run_in_sandbox;
use crate::tools::Tool;

pub struct RunScriptTool {
    interpreter: String,
    timeout_secs: u64,
}

impl RunScriptTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout_secs,
        }
    }

    /// 覆盖解释器（测试用）
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }
}

#[async_trait]
impl Tool for RunScriptTool {
    fn name(&self) -> &str {
        "run_script"
    }

    fn description(&self) -> &str {
        "Execute a Python code snippet in a separate process and return structured output \
         (stdout, stderr, returncode, success)."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "The Python code to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let code = args.get("code").and_then(|v| v.as_str()).unwrap_or("");
        if code.trim().is_empty() {
            return Err("Missing code".to_string());
        }

        tracing::info!(bytes = code.len(), "run_script");
        let result = run_in_sandbox(&self.interpreter, ".py", code, self.timeout_secs).await;
        Ok(result.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_interpreter_still_structured() {
        let tool = RunScriptTool::new(5).with_interpreter("definitely-missing-binary-xyz");
        let out = tool
            .execute(serde_json::json!({"code": "print(1)"}))
            .await
            .unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["returncode"], -1);
    }
}
