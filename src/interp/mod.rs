//! 能力受限的表达式/脚本解释器
//!
//! eval / exec 两个处理器的后端：不暴露任意代码执行，环境是一个显式
//! 白名单——注册表里的工具函数，外加算术、字符串与 print。
//!
//! - **eval**：单表达式，求值结果回填为下一条自消息
//! - **exec**：多语句脚本，捕获 print 输出与裸表达式的值

pub mod eval;
pub mod parser;

use thiserror::Error;

pub use eval::Evaluator;
pub use parser::{parse_expression, parse_script, Arg, Expr};

use crate::tools::ToolExecutor;

/// 解释器的值类型
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
    Unit,
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // 整数值不带小数点展示
            Value::Num(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{}", *n as i64),
            Value::Num(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Unit => Ok(()),
        }
    }
}

/// 求值错误：全部转为错误文本回填给模型，绝不向上抛
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("bad call to {0}")]
    BadCall(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("tool error: {0}")]
    Tool(String),
}

/// 求值单个表达式，返回展示文本（print 输出在前，值在后）
pub async fn evaluate(expr: &str, executor: &ToolExecutor) -> Result<String, EvalError> {
    let parsed = parse_expression(expr)?;
    let mut evaluator = Evaluator::new(executor);
    let value = evaluator.eval(&parsed).await?;
    let output = evaluator.into_output();
    if output.is_empty() {
        Ok(value.to_string())
    } else {
        Ok(format!("{}{}", output, value))
    }
}

/// 执行多语句脚本，返回捕获的输出（print + 裸表达式的值，每条一行）
pub async fn execute(script: &str, executor: &ToolExecutor) -> Result<String, EvalError> {
    let stmts = parse_script(script)?;
    let mut evaluator = Evaluator::new(executor);
    for stmt in &stmts {
        let value = evaluator.eval(stmt).await?;
        evaluator.capture_value(&value);
    }
    Ok(evaluator.into_output())
}
