//! 沙箱执行公共部分
//!
//! 脚本写入临时文件后由解释器子进程运行，带墙钟超时；
//! 无论成功、失败还是超时都返回结构化结果，绝不向上抛异常。

use std::io::Write;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;

/// 子进程执行结果：与模型约定的固定字段
#[derive(Debug, Serialize)]
pub struct SandboxResult {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i64,
    pub success: bool,
}

impl SandboxResult {
    fn failure(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            returncode: -1,
            success: false,
        }
    }

    /// 序列化为返回给模型的 JSON 文本
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| {
            // 序列化失败时退化为最小结构
            r#"{"stdout": "", "stderr": "Failed to serialize output to JSON", "returncode": -1, "success": false}"#
                .to_string()
        })
    }
}

/// 将 source 写入带后缀的临时文件并用 interpreter 运行，超时 timeout_secs 秒。
/// 超时报告为独立的非致命结果（stderr = "Timeout expired"）。
pub async fn run_in_sandbox(
    interpreter: &str,
    suffix: &str,
    source: &str,
    timeout_secs: u64,
) -> SandboxResult {
    let mut file = match tempfile::Builder::new().suffix(suffix).tempfile() {
        Ok(f) => f,
        Err(e) => return SandboxResult::failure(format!("Failed to create temp file: {e}")),
    };
    if let Err(e) = file.write_all(source.as_bytes()) {
        return SandboxResult::failure(format!("Failed to write temp file: {e}"));
    }

    let output = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        Command::new(interpreter).arg(file.path()).output(),
    )
    .await;

    match output {
        Ok(Ok(output)) => SandboxResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            returncode: output.status.code().map(i64::from).unwrap_or(-1),
            success: output.status.success(),
        },
        Ok(Err(e)) => SandboxResult::failure(e.to_string()),
        Err(_) => SandboxResult::failure("Timeout expired"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_interpreter_is_structured_failure() {
        let result = run_in_sandbox("definitely-missing-binary-xyz", ".sh", "echo hi", 5).await;
        assert!(!result.success);
        assert_eq!(result.returncode, -1);
        assert!(!result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_outcome() {
        let result = run_in_sandbox("bash", ".sh", "sleep 5", 1).await;
        assert!(!result.success);
        assert_eq!(result.returncode, -1);
        assert_eq!(result.stderr, "Timeout expired");
    }

    #[tokio::test]
    async fn test_successful_run_captures_stdout() {
        let result = run_in_sandbox("bash", ".sh", "echo hello", 5).await;
        assert!(result.success);
        assert_eq!(result.returncode, 0);
        assert_eq!(result.stdout.trim(), "hello");
    }
}
