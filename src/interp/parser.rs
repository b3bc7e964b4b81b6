//! 表达式语法：词法与递归下降解析
//!
//! 支持数字/字符串/布尔字面量、`+ - * /` 与一元负号、括号，
//! 以及 `name(arg, ..., key=value, ...)` 形式的函数调用。
//! 语句以换行或分号分隔。

use crate::interp::EvalError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Str(String),
    Bool(bool),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Eq,
    /// 语句分隔：换行或分号
    Sep,
}

fn tokenize(src: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            '\n' | ';' => {
                chars.next();
                tokens.push(Token::Sep);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some('"') => s.push('"'),
                            Some('\\') => s.push('\\'),
                            Some(other) => {
                                return Err(EvalError::Syntax(format!(
                                    "unknown escape: \\{other}"
                                )))
                            }
                            None => {
                                return Err(EvalError::Syntax(
                                    "unterminated string".to_string(),
                                ))
                            }
                        },
                        Some(other) => s.push(other),
                        None => {
                            return Err(EvalError::Syntax("unterminated string".to_string()))
                        }
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() => {
                let mut num = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = num
                    .parse::<f64>()
                    .map_err(|_| EvalError::Syntax(format!("bad number: {num}")))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match ident.as_str() {
                    "true" => tokens.push(Token::Bool(true)),
                    "false" => tokens.push(Token::Bool(false)),
                    _ => tokens.push(Token::Ident(ident)),
                }
            }
            other => {
                return Err(EvalError::Syntax(format!("unexpected character: {other}")));
            }
        }
    }
    Ok(tokens)
}

/// 调用实参：位置参数或 key=value 关键字参数
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Positional(Expr),
    Keyword(String, Expr),
}

/// 二元运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// 表达式 AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Arg>,
    },
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, expected: &Token) -> Result<(), EvalError> {
        match self.next() {
            Some(ref t) if t == expected => Ok(()),
            other => Err(EvalError::Syntax(format!(
                "expected {expected:?}, found {other:?}"
            ))),
        }
    }

    fn skip_seps(&mut self) {
        while matches!(self.peek(), Some(Token::Sep)) {
            self.pos += 1;
        }
    }

    /// expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// factor := NUMBER | STRING | BOOL | call | ident? | '-' factor | '(' expr ')'
    fn factor(&mut self) -> Result<Expr, EvalError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Bool(b)) => Ok(Expr::Bool(b)),
            Some(Token::Minus) => Ok(Expr::Neg(Box::new(self.factor()?))),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.eat(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.pos += 1;
                    let args = self.call_args()?;
                    Ok(Expr::Call { name, args })
                } else {
                    // 裸标识符没有可绑定的变量环境
                    Err(EvalError::Syntax(format!("unknown identifier: {name}")))
                }
            }
            other => Err(EvalError::Syntax(format!("unexpected token: {other:?}"))),
        }
    }

    /// 已吃掉 '('，解析到 ')' 为止
    fn call_args(&mut self) -> Result<Vec<Arg>, EvalError> {
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            // 关键字参数：ident '=' expr（向前看两格区分于位置参数）
            let is_keyword = matches!(self.peek(), Some(Token::Ident(_)))
                && matches!(self.tokens.get(self.pos + 1), Some(Token::Eq));
            if is_keyword {
                let name = match self.next() {
                    Some(Token::Ident(name)) => name,
                    other => {
                        return Err(EvalError::Syntax(format!(
                            "expected parameter name, found {other:?}"
                        )))
                    }
                };
                self.pos += 1; // '='
                args.push(Arg::Keyword(name, self.expr()?));
            } else {
                args.push(Arg::Positional(self.expr()?));
            }
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                other => {
                    return Err(EvalError::Syntax(format!(
                        "expected ',' or ')', found {other:?}"
                    )))
                }
            }
        }
        Ok(args)
    }
}

/// 解析单个表达式（允许首尾的空行/分号）
pub fn parse_expression(src: &str) -> Result<Expr, EvalError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.skip_seps();
    let expr = parser.expr()?;
    parser.skip_seps();
    if parser.peek().is_some() {
        return Err(EvalError::Syntax(format!(
            "trailing input after expression: {:?}",
            parser.peek()
        )));
    }
    Ok(expr)
}

/// 解析多语句脚本：语句以换行或分号分隔
pub fn parse_script(src: &str) -> Result<Vec<Expr>, EvalError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut stmts = Vec::new();
    loop {
        parser.skip_seps();
        if parser.peek().is_none() {
            break;
        }
        stmts.push(parser.expr()?);
        match parser.peek() {
            None | Some(Token::Sep) => {}
            other => {
                return Err(EvalError::Syntax(format!(
                    "expected end of statement, found {other:?}"
                )))
            }
        }
    }
    Ok(stmts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_precedence() {
        let e = parse_expression("1 + 2 * 3").unwrap();
        match e {
            Expr::Binary { op: BinOp::Add, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_string_escapes() {
        let e = parse_expression(r#""a\nb""#).unwrap();
        assert_eq!(e, Expr::Str("a\nb".to_string()));
    }

    #[test]
    fn test_call_with_keyword_args() {
        let e = parse_expression(r#"scrape_website(url="https://example.com")"#).unwrap();
        match e {
            Expr::Call { name, args } => {
                assert_eq!(name, "scrape_website");
                assert!(matches!(&args[0], Arg::Keyword(k, _) if k == "url"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_script_statements() {
        let stmts = parse_script("1 + 1\nprint(\"hi\"); 2 * 2\n").unwrap();
        assert_eq!(stmts.len(), 3);
    }

    #[test]
    fn test_bare_identifier_is_syntax_error() {
        assert!(matches!(
            parse_expression("undefined_variable"),
            Err(EvalError::Syntax(_))
        ));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            parse_expression(r#""abc"#),
            Err(EvalError::Syntax(_))
        ));
    }
}
