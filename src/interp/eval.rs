//! 表达式求值器
//!
//! 环境即工具执行器：函数调用按名查找注册表工具，位置参数按 schema 的
//! required 顺序绑定，关键字参数按名绑定。print 输出写入捕获缓冲区。

use futures_util::future::BoxFuture;
use serde_json::Value as Json;

use crate::interp::parser::{Arg, BinOp, Expr};
use crate::interp::{EvalError, Value};
use crate::tools::{required_params, ToolExecutor};

/// 求值器：持有工具执行器引用与输出缓冲
pub struct Evaluator<'a> {
    executor: &'a ToolExecutor,
    output: String,
}

impl<'a> Evaluator<'a> {
    pub fn new(executor: &'a ToolExecutor) -> Self {
        Self {
            executor,
            output: String::new(),
        }
    }

    /// 捕获裸表达式语句的值（exec 模式下每条一行）
    pub fn capture_value(&mut self, value: &Value) {
        if !matches!(value, Value::Unit) {
            self.output.push_str(&value.to_string());
            self.output.push('\n');
        }
    }

    /// 取走捕获的输出
    pub fn into_output(self) -> String {
        self.output
    }

    /// 递归求值（异步递归需要 BoxFuture）
    pub fn eval<'b>(&'b mut self, expr: &'b Expr) -> BoxFuture<'b, Result<Value, EvalError>> {
        Box::pin(async move {
            match expr {
                Expr::Num(n) => Ok(Value::Num(*n)),
                Expr::Str(s) => Ok(Value::Str(s.clone())),
                Expr::Bool(b) => Ok(Value::Bool(*b)),
                Expr::Neg(inner) => match self.eval(inner).await? {
                    Value::Num(n) => Ok(Value::Num(-n)),
                    other => Err(EvalError::TypeMismatch(format!(
                        "cannot negate {other:?}"
                    ))),
                },
                Expr::Binary { op, lhs, rhs } => {
                    let l = self.eval(lhs).await?;
                    let r = self.eval(rhs).await?;
                    binary_op(*op, l, r)
                }
                Expr::Call { name, args } => self.call(name, args).await,
            }
        })
    }

    async fn call(&mut self, name: &str, args: &[Arg]) -> Result<Value, EvalError> {
        if name == "print" {
            let mut parts = Vec::new();
            for arg in args {
                match arg {
                    Arg::Positional(e) => parts.push(self.eval(e).await?.to_string()),
                    Arg::Keyword(k, _) => {
                        return Err(EvalError::BadCall(format!(
                            "print: unexpected keyword argument {k}"
                        )))
                    }
                }
            }
            self.output.push_str(&parts.join(" "));
            self.output.push('\n');
            return Ok(Value::Unit);
        }

        let tool = self
            .executor
            .get_tool(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        let params = required_params(&tool.parameters_schema());

        let mut object = serde_json::Map::new();
        let mut positional = 0usize;
        for arg in args {
            match arg {
                Arg::Positional(e) => {
                    let param = params.get(positional).ok_or_else(|| {
                        EvalError::BadCall(format!(
                            "{name}: too many positional arguments (expected {})",
                            params.len()
                        ))
                    })?;
                    let value = self.eval(e).await?;
                    object.insert(param.clone(), to_json(&value));
                    positional += 1;
                }
                Arg::Keyword(k, e) => {
                    let value = self.eval(e).await?;
                    object.insert(k.clone(), to_json(&value));
                }
            }
        }

        match self.executor.execute(name, Json::Object(object)).await {
            Ok(result) => Ok(Value::Str(result)),
            Err(e) => Err(EvalError::Tool(e.to_string())),
        }
    }
}

fn binary_op(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    match (op, l, r) {
        // 任一侧是字符串时 '+' 为拼接
        (BinOp::Add, Value::Str(a), b) => Ok(Value::Str(format!("{a}{b}"))),
        (BinOp::Add, a, Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (BinOp::Add, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
        (BinOp::Sub, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a - b)),
        (BinOp::Mul, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a * b)),
        (BinOp::Div, Value::Num(_), Value::Num(b)) if b == 0.0 => Err(EvalError::DivisionByZero),
        (BinOp::Div, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a / b)),
        (op, l, r) => Err(EvalError::TypeMismatch(format!(
            "cannot apply {op:?} to {l:?} and {r:?}"
        ))),
    }
}

fn to_json(value: &Value) -> Json {
    match value {
        Value::Num(n) if n.fract() == 0.0 && n.is_finite() => Json::from(*n as i64),
        Value::Num(n) => {
            serde_json::Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null)
        }
        Value::Str(s) => Json::String(s.clone()),
        Value::Bool(b) => Json::Bool(*b),
        Value::Unit => Json::Null,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value as Json;

    use super::*;
    use crate::interp::{evaluate, execute};
    use crate::tools::{Tool, ToolRegistry};

    struct GreetTool;

    #[async_trait]
    impl Tool for GreetTool {
        fn name(&self) -> &str {
            "greet"
        }

        fn description(&self) -> &str {
            "Greet someone."
        }

        fn parameters_schema(&self) -> Json {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "punct": {"type": "string"}
                },
                "required": ["name"]
            })
        }

        async fn execute(&self, args: Json) -> Result<String, String> {
            let name = args.get("name").and_then(|v| v.as_str()).unwrap_or("?");
            let punct = args.get("punct").and_then(|v| v.as_str()).unwrap_or("!");
            Ok(format!("Hello, {name}{punct}"))
        }
    }

    fn executor() -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(GreetTool);
        ToolExecutor::new(registry, 5)
    }

    #[tokio::test]
    async fn test_arithmetic() {
        let ex = executor();
        assert_eq!(evaluate("1 + 2 * 3", &ex).await.unwrap(), "7");
        assert_eq!(evaluate("(1 + 2) * 3", &ex).await.unwrap(), "9");
        assert_eq!(evaluate("-4 + 1", &ex).await.unwrap(), "-3");
        assert_eq!(evaluate("7 / 2", &ex).await.unwrap(), "3.5");
    }

    #[tokio::test]
    async fn test_division_by_zero() {
        let ex = executor();
        let err = evaluate("1/0", &ex).await.unwrap_err();
        assert!(err.to_string().contains("division by zero"));
    }

    #[tokio::test]
    async fn test_string_concat() {
        let ex = executor();
        assert_eq!(evaluate(r#""a" + "b""#, &ex).await.unwrap(), "ab");
        assert_eq!(evaluate(r#""n=" + 2"#, &ex).await.unwrap(), "n=2");
    }

    #[tokio::test]
    async fn test_tool_call_positional_and_keyword() {
        let ex = executor();
        assert_eq!(
            evaluate(r#"greet("world")"#, &ex).await.unwrap(),
            "Hello, world!"
        );
        assert_eq!(
            evaluate(r#"greet("world", punct="?")"#, &ex).await.unwrap(),
            "Hello, world?"
        );
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let ex = executor();
        let err = evaluate("unknown_fn(1)", &ex).await.unwrap_err();
        assert!(err.to_string().contains("unknown_fn"));
    }

    #[tokio::test]
    async fn test_script_captures_output() {
        let ex = executor();
        let out = execute("print(\"first\")\n1 + 1\ngreet(\"x\")", &ex)
            .await
            .unwrap();
        assert_eq!(out, "first\n2\nHello, x!\n");
    }

    #[tokio::test]
    async fn test_too_many_positional() {
        let ex = executor();
        let err = evaluate(r#"greet("a", "b")"#, &ex).await.unwrap_err();
        assert!(err.to_string().contains("too many positional"));
    }
}
