//! Decision：模型回复的结构化解析
//!
//! 两种线格式都支持：
//! (a) 单对象 `{"recipient": ..., "content": ...}`（可带 ```json 围栏与多余键）；
//! (b) tool-call 列表：函数名即收件人标签，arguments 的 content 字段（或整个
//!     arguments 文本）即内容，每个条目的 id 保留为 call_id。
//!
//! 收件人是封闭枚举：未知的裸标签在这里就被拦下（按一次格式错误处理），
//! 子代理必须用 `agent:<name>`（兼容旧写法 `agent_<name>`）。

use serde_json::Value;

use crate::core::AgentError;

/// 收件人标签：封闭枚举，Router 对其穷尽匹配
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// 回给自己，下一回合以 assistant 角色注入
    SelfLoop,
    /// 追加到调用方结果列表
    Caller,
    /// 清空会话历史
    Clear,
    /// 单表达式求值（旧写法 python_eval）
    Eval,
    /// 多语句脚本执行（旧写法 python_exec）
    Exec,
    /// 历史压缩为摘要
    Compact,
    /// 向人类用户要输入
    AskUser,
    /// 子代理
    Agent(String),
}

impl Recipient {
    /// 解析收件人标签；self_name 用于「标签等于自己名字」的情况
    pub fn parse(label: &str, self_name: &str) -> Result<Self, AgentError> {
        match label {
            "self" => Ok(Recipient::SelfLoop),
            "caller" => Ok(Recipient::Caller),
            "clear" => Ok(Recipient::Clear),
            "eval" | "python_eval" => Ok(Recipient::Eval),
            "exec" | "python_exec" => Ok(Recipient::Exec),
            "compact" => Ok(Recipient::Compact),
            "ask_user" => Ok(Recipient::AskUser),
            l if l == self_name => Ok(Recipient::SelfLoop),
            l => {
                let name = l.strip_prefix("agent:").or_else(|| l.strip_prefix("agent_"));
                match name {
                    Some(name) if !name.is_empty() => Ok(Recipient::Agent(name.to_string())),
                    _ => Err(AgentError::MalformedDecision(format!(
                        "unknown recipient label: {label}"
                    ))),
                }
            }
        }
    }
}

/// 一条已解析的决策：消费即焚
#[derive(Debug, Clone)]
pub struct Decision {
    pub recipient: Recipient,
    pub content: String,
    /// tool-call 线格式的条目 id（eval/exec 结果以 Tool 角色回填时使用）
    pub call_id: Option<String>,
}

/// 从回复文本中定位 JSON 块：```json 围栏优先，否则取首个 '{' 或 '[' 到配对末尾
fn extract_json(raw: &str) -> Result<&str, AgentError> {
    let trimmed = raw.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Ok(rest
            .find("```")
            .map(|end| rest[..end].trim())
            .unwrap_or_else(|| rest.trim()));
    }

    let obj = trimmed.find('{');
    let arr = trimmed.find('[');
    let (start, close) = match (obj, arr) {
        (Some(o), Some(a)) if a < o => (a, ']'),
        (None, Some(a)) => (a, ']'),
        (Some(o), _) => (o, '}'),
        (None, None) => {
            return Err(AgentError::MalformedDecision(format!(
                "no JSON found in reply: {trimmed}"
            )))
        }
    };
    match trimmed.rfind(close) {
        Some(end) if end > start => Ok(&trimmed[start..=end]),
        _ => Err(AgentError::MalformedDecision(format!(
            "unbalanced JSON in reply: {trimmed}"
        ))),
    }
}

/// content 键可能是任意 JSON 值；非字符串时取其紧凑文本
fn content_text(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// 单对象线格式
fn parse_single(obj: &Value, self_name: &str) -> Result<Decision, AgentError> {
    let map = obj.as_object().ok_or_else(|| {
        AgentError::MalformedDecision(format!("reply is not a mapping: {obj}"))
    })?;
    let label = map
        .get("recipient")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            AgentError::MalformedDecision(format!("missing recipient key: {obj}"))
        })?;
    let content = map
        .get("content")
        .ok_or_else(|| AgentError::MalformedDecision(format!("missing content key: {obj}")))?;

    Ok(Decision {
        recipient: Recipient::parse(label, self_name)?,
        content: content_text(content),
        call_id: None,
    })
}

/// tool-call 列表线格式：function.name 为标签，arguments 的 content 字段为内容
fn parse_tool_calls(calls: &[Value], self_name: &str) -> Result<Vec<Decision>, AgentError> {
    let mut decisions = Vec::with_capacity(calls.len());
    for call in calls {
        let function = call.get("function").unwrap_or(call);
        let label = function
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AgentError::MalformedDecision(format!("tool call without function name: {call}"))
            })?;

        let arguments = function.get("arguments").cloned().unwrap_or(Value::Null);
        // arguments 常见为 JSON 编码的字符串，也兼容直接内联对象
        let parsed_args = match &arguments {
            Value::String(s) => serde_json::from_str::<Value>(s).unwrap_or(Value::Null),
            other => other.clone(),
        };
        let content = match parsed_args.get("content") {
            Some(c) => content_text(c),
            None => match &arguments {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            },
        };

        decisions.push(Decision {
            recipient: Recipient::parse(label, self_name)?,
            content,
            call_id: call.get("id").and_then(|v| v.as_str()).map(String::from),
        });
    }
    Ok(decisions)
}

/// 把一条原始模型回复解析为零至多条 Decision
pub fn parse_decisions(raw: &str, self_name: &str) -> Result<Vec<Decision>, AgentError> {
    let json_str = extract_json(raw)?;
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| AgentError::MalformedDecision(format!("{e}: {json_str}")))?;

    match &value {
        Value::Array(calls) => parse_tool_calls(calls, self_name),
        Value::Object(map) => match map.get("tool_calls").and_then(|v| v.as_array()) {
            Some(calls) => parse_tool_calls(calls, self_name),
            None => Ok(vec![parse_single(&value, self_name)?]),
        },
        other => Err(AgentError::MalformedDecision(format!(
            "reply is not a mapping: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELF: &str = "general_reasoning_agent";

    #[test]
    fn test_single_object() {
        let d = parse_decisions(r#"{"recipient": "self", "content": "hello"}"#, SELF).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].recipient, Recipient::SelfLoop);
        assert_eq!(d[0].content, "hello");
        assert!(d[0].call_id.is_none());
    }

    #[test]
    fn test_fenced_with_extra_keys() {
        let raw = "Sure!\n```json\n{\"sender\": \"a\", \"recipient\": \"caller\", \"content\": \"done\"}\n```";
        let d = parse_decisions(raw, SELF).unwrap();
        assert_eq!(d[0].recipient, Recipient::Caller);
        assert_eq!(d[0].content, "done");
    }

    #[test]
    fn test_non_string_content_is_stringified() {
        let d = parse_decisions(r#"{"recipient": "caller", "content": 42}"#, SELF).unwrap();
        assert_eq!(d[0].content, "42");
    }

    #[test]
    fn test_legacy_aliases() {
        let d = parse_decisions(r#"{"recipient": "python_eval", "content": "1+1"}"#, SELF).unwrap();
        assert_eq!(d[0].recipient, Recipient::Eval);
        let d = parse_decisions(r#"{"recipient": "python_exec", "content": "print(1)"}"#, SELF)
            .unwrap();
        assert_eq!(d[0].recipient, Recipient::Exec);
    }

    #[test]
    fn test_own_name_maps_to_self() {
        let raw = format!(r#"{{"recipient": "{SELF}", "content": "note"}}"#);
        let d = parse_decisions(&raw, SELF).unwrap();
        assert_eq!(d[0].recipient, Recipient::SelfLoop);
    }

    #[test]
    fn test_agent_prefixes() {
        let d = parse_decisions(r#"{"recipient": "agent:helper", "content": "x"}"#, SELF).unwrap();
        assert_eq!(d[0].recipient, Recipient::Agent("helper".to_string()));
        let d = parse_decisions(r#"{"recipient": "agent_helper", "content": "x"}"#, SELF).unwrap();
        assert_eq!(d[0].recipient, Recipient::Agent("helper".to_string()));
    }

    #[test]
    fn test_unknown_bare_label_is_rejected() {
        let err = parse_decisions(r#"{"recipient": "helper", "content": "x"}"#, SELF).unwrap_err();
        assert!(err.to_string().contains("unknown recipient label"));
    }

    #[test]
    fn test_tool_call_list() {
        let raw = r#"[
            {"id": "call_1", "function": {"name": "eval", "arguments": "{\"content\": \"1+1\"}"}},
            {"id": "call_2", "function": {"name": "caller", "arguments": "{\"content\": \"2\"}"}}
        ]"#;
        let d = parse_decisions(raw, SELF).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d[0].recipient, Recipient::Eval);
        assert_eq!(d[0].content, "1+1");
        assert_eq!(d[0].call_id.as_deref(), Some("call_1"));
        assert_eq!(d[1].recipient, Recipient::Caller);
        assert_eq!(d[1].call_id.as_deref(), Some("call_2"));
    }

    #[test]
    fn test_tool_calls_wrapped_in_object() {
        let raw = r#"{"tool_calls": [{"function": {"name": "self", "arguments": {"content": "hi"}}}]}"#;
        let d = parse_decisions(raw, SELF).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].recipient, Recipient::SelfLoop);
        assert_eq!(d[0].content, "hi");
    }

    #[test]
    fn test_arguments_without_content_field() {
        let raw = r#"[{"function": {"name": "exec", "arguments": "print(1)"}}]"#;
        let d = parse_decisions(raw, SELF).unwrap();
        assert_eq!(d[0].content, "print(1)");
    }

    #[test]
    fn test_sentinel_is_malformed() {
        let err = parse_decisions("[LLM error: connection refused]", SELF).unwrap_err();
        assert!(matches!(err, AgentError::MalformedDecision(_)));
    }

    #[test]
    fn test_prose_is_malformed() {
        let err = parse_decisions("I will get right to it.", SELF).unwrap_err();
        assert!(matches!(err, AgentError::MalformedDecision(_)));
    }
}
