//! 知识文件工具：仅追加的持久化文本
//!
//! store_knowledge 每次追加一条带时间戳的记录；read_knowledge 整文件读回。
//! 没有索引也没有检索，就是一个跨会话的平面记事本。

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::Tool;

fn append_record(path: &Path, information: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M");
    writeln!(file, "[{}] {}", stamp, information)
}

/// store_knowledge：追加一条记录
pub struct StoreKnowledgeTool {
    path: PathBuf,
}

impl StoreKnowledgeTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Tool for StoreKnowledgeTool {
    fn name(&self) -> &str {
        "store_knowledge"
    }

    fn description(&self) -> &str {
        "Store permanent information in the knowledge file (append-only, survives restarts)."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "information": {
                    "type": "string",
                    "description": "The information to remember"
                }
            },
            "required": ["information"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let information = args
            .get("information")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if information.is_empty() {
            return Err("Missing information".to_string());
        }
        append_record(&self.path, information)
            .map_err(|e| format!("Error storing information: {e}"))?;
        Ok("Stored.".to_string())
    }
}

/// read_knowledge：读回全部记录
pub struct ReadKnowledgeTool {
    path: PathBuf,
}

impl ReadKnowledgeTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Tool for ReadKnowledgeTool {
    fn name(&self) -> &str {
        "read_knowledge"
    }

    fn description(&self) -> &str {
        "Read all permanent information from the knowledge file."
    }

    async fn execute(&self, _args: Value) -> Result<String, String> {
        // 文件还不存在时返回空串，与「尚无知识」同义
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(format!("Error reading information: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.txt");
        let store = StoreKnowledgeTool::new(&path);
        let read = ReadKnowledgeTool::new(&path);

        store
            .execute(serde_json::json!({"information": "the sky is blue"}))
            .await
            .unwrap();
        store
            .execute(serde_json::json!({"information": "water is wet"}))
            .await
            .unwrap();

        let content = read.execute(serde_json::json!({})).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("the sky is blue"));
        assert!(lines[1].contains("water is wet"));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let read = ReadKnowledgeTool::new(dir.path().join("absent.txt"));
        assert_eq!(read.execute(serde_json::json!({})).await.unwrap(), "");
    }
}
