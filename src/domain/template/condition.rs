//! Conditional-logic expressions.
//!
//! Conditions are parsed once at template load into [`Condition`], so the
//! conversation never interprets raw strings. Grammar:
//!
//! ```text
//! expr    := and ( ("||" | "or") and )*
//! and     := unary ( ("&&" | "and") unary )*
//! unary   := ("!" | "not") unary | primary
//! primary := "(" expr ")" | FIELD ( OP literal )?
//! OP      := == | != | < | <= | > | >=
//! literal := 'str' | "str" | number | true | false | bareword
//! ```
//!
//! A bare `FIELD` is a presence check: answered and truthy.

use std::cmp::Ordering;
use std::fmt;

use crate::domain::conversation::AnswerMap;
use crate::domain::validation::{parse_bool, parse_date, parse_number, TypedValue};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        })
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
}

/// A parsed condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field answered with a truthy value.
    Present(String),
    Not(Box<Condition>),
    Compare {
        field: String,
        op: CompareOp,
        value: Literal,
    },
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    /// Parses condition source text.
    pub fn parse(source: &str) -> Result<Self, String> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err("condition is empty".to_string());
        }
        let mut parser = Parser { tokens, pos: 0 };
        let condition = parser.expr()?;
        match parser.peek() {
            None => Ok(condition),
            Some(tok) => Err(format!("unexpected token {:?}", tok)),
        }
    }

    /// Field ids the condition reads.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Present(field) | Self::Compare { field, .. } => out.push(field),
            Self::Not(inner) => inner.collect_fields(out),
            Self::All(parts) | Self::Any(parts) => {
                parts.iter().for_each(|p| p.collect_fields(out))
            }
        }
    }

    /// Evaluates against the current answers.
    ///
    /// A comparison against an unanswered field is false regardless of the
    /// operator.
    pub fn evaluate(&self, answers: &AnswerMap) -> bool {
        match self {
            Self::Present(field) => answers.get(field).is_some_and(TypedValue::is_truthy),
            Self::Not(inner) => !inner.evaluate(answers),
            Self::Compare { field, op, value } => answers
                .get(field)
                .and_then(|answer| compare(answer, value, *op))
                .unwrap_or(false),
            Self::All(parts) => parts.iter().all(|p| p.evaluate(answers)),
            Self::Any(parts) => parts.iter().any(|p| p.evaluate(answers)),
        }
    }
}

/// `Some(result)` when the answer and literal are comparable.
fn compare(answer: &TypedValue, literal: &Literal, op: CompareOp) -> Option<bool> {
    let ordering = match (answer, literal) {
        (TypedValue::Empty, _) => return None,
        (TypedValue::Number(n), Literal::Num(m)) => n.partial_cmp(m)?,
        (TypedValue::Number(n), Literal::Str(s)) => n.partial_cmp(&parse_number(s)?)?,
        (TypedValue::Boolean(b), Literal::Bool(l)) => b.cmp(l),
        (TypedValue::Boolean(b), Literal::Str(s)) => b.cmp(&parse_bool(s)?),
        (TypedValue::Date(d), Literal::Str(s)) => d.cmp(&parse_date(s)?),
        (other, lit) => {
            // Textual values only support equality, case-insensitively.
            if !matches!(op, CompareOp::Eq | CompareOp::Ne) {
                return None;
            }
            let rhs = match lit {
                Literal::Str(s) => s.clone(),
                Literal::Num(n) => n.to_string(),
                Literal::Bool(b) => b.to_string(),
            };
            if other.canonical().eq_ignore_ascii_case(rhs.trim()) {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        }
    };
    Some(op.holds(ordering))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Op(CompareOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Op(CompareOp::Eq));
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Op(CompareOp::Ne));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '<' | '>' => {
                let inclusive = next == Some('=');
                let op = match (c, inclusive) {
                    ('<', false) => CompareOp::Lt,
                    ('<', true) => CompareOp::Le,
                    ('>', false) => CompareOp::Gt,
                    _ => CompareOp::Ge,
                };
                tokens.push(Token::Op(op));
                i += if inclusive { 2 } else { 1 };
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&ch| ch == quote)
                    .map(|offset| start + offset)
                    .ok_or_else(|| "unterminated string literal".to_string())?;
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number {}", text))?;
                tokens.push(Token::Num(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.' | '-'))
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.to_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                });
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
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
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expr(&mut self) -> Result<Condition, String> {
        let mut parts = vec![self.and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            parts.push(self.and()?);
        }
        Ok(if parts.len() == 1 { parts.remove(0) } else { Condition::Any(parts) })
    }

    fn and(&mut self) -> Result<Condition, String> {
        let mut parts = vec![self.unary()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            parts.push(self.unary()?);
        }
        Ok(if parts.len() == 1 { parts.remove(0) } else { Condition::All(parts) })
    }

    fn unary(&mut self) -> Result<Condition, String> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Condition::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Condition, String> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("expected ')'".to_string()),
                }
            }
            Some(Token::Ident(field)) => {
                let Some(Token::Op(op)) = self.peek().cloned() else {
                    return Ok(Condition::Present(field));
                };
                self.pos += 1;
                let value = self.literal()?;
                Ok(Condition::Compare { field, op, value })
            }
            Some(tok) => Err(format!("expected a field name, found {:?}", tok)),
            None => Err("unexpected end of condition".to_string()),
        }
    }

    fn literal(&mut self) -> Result<Literal, String> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Literal::Str(s)),
            Some(Token::Num(n)) => Ok(Literal::Num(n)),
            Some(Token::Ident(word)) => Ok(match word.to_lowercase().as_str() {
                "true" => Literal::Bool(true),
                "false" => Literal::Bool(false),
                _ => Literal::Str(word),
            }),
            Some(tok) => Err(format!("expected a value, found {:?}", tok)),
            None => Err("missing value after operator".to_string()),
        }
    }
}
