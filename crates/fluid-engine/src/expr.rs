//! Safe evaluator for resolved `calc()` bodies.
//!
//! Input must consist only of digits, `.`, `+ - * /`, parentheses and
//! whitespace; anything else is rejected before parsing. Operators apply
//! strictly left to right and parentheses are the only grouping, so
//! `2 + 3 * 4` is `20`.
//!
//! # Failure Modes
//!
//! | Input | Error |
//! |-------|-------|
//! | disallowed character, empty | [`ComputeError::UnsafeExpression`] |
//! | dangling operator, unbalanced parens, bad number | [`ComputeError::MalformedExpression`] |
//! | `x / 0` | [`ComputeError::DivisionByZero`] |

use fluid_parse::ArithOp;

use crate::error::{ComputeError, Result};

/// Nesting limit for parentheses and unary signs.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Op(ArithOp),
    Open,
    Close,
}

/// Whether `expression` passes the character whitelist.
#[must_use]
pub fn is_safe(expression: &str) -> bool {
    !expression.trim().is_empty()
        && expression.chars().all(|c| {
            c.is_ascii_digit()
                || c.is_ascii_whitespace()
                || matches!(c, '.' | '+' | '-' | '*' | '/' | '(' | ')')
        })
}

pub fn evaluate(expression: &str) -> Result<f64> {
    if !is_safe(expression) {
        return Err(ComputeError::UnsafeExpression {
            expression: expression.to_owned(),
        });
    }
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
        expression,
    };
    let value = parser.sequence()?;
    if parser.pos != tokens.len() || !value.is_finite() {
        return Err(parser.malformed());
    }
    Ok(value)
}

fn tokenize(expression: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            c if c.is_ascii_whitespace() => {}
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start + 1;
                while let Some(&(i, next)) = chars.peek() {
                    if !(next.is_ascii_digit() || next == '.') {
                        break;
                    }
                    end = i + 1;
                    chars.next();
                }
                let number = expression[start..end].parse().map_err(|_| {
                    ComputeError::MalformedExpression {
                        expression: expression.to_owned(),
                    }
                })?;
                tokens.push(Token::Number(number));
            }
            c => {
                let op = ArithOp::from_char(c).ok_or_else(|| ComputeError::UnsafeExpression {
                    expression: expression.to_owned(),
                })?;
                tokens.push(Token::Op(op));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    expression: &'a str,
}

impl Parser<'_> {
    fn malformed(&self) -> ComputeError {
        ComputeError::MalformedExpression {
            expression: self.expression.to_owned(),
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn sequence(&mut self) -> Result<f64> {
        let mut acc = self.operand()?;
        while let Some(Token::Op(op)) = self.peek() {
            self.pos += 1;
            let rhs = self.operand()?;
            acc = self.apply(acc, op, rhs)?;
        }
        Ok(acc)
    }

    fn operand(&mut self) -> Result<f64> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.malformed());
        }
        let value = self.operand_inner();
        self.depth -= 1;
        value
    }

    fn operand_inner(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(n)
            }
            Some(Token::Op(ArithOp::Sub)) => {
                self.pos += 1;
                Ok(-self.operand()?)
            }
            Some(Token::Op(ArithOp::Add)) => {
                self.pos += 1;
                self.operand()
            }
            Some(Token::Open) => {
                self.pos += 1;
                let value = self.sequence()?;
                if self.peek() != Some(Token::Close) {
                    return Err(self.malformed());
                }
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.malformed()),
        }
    }

    fn apply(&self, lhs: f64, op: ArithOp, rhs: f64) -> Result<f64> {
        match op {
            ArithOp::Add => Ok(lhs + rhs),
            ArithOp::Sub => Ok(lhs - rhs),
            ArithOp::Mul => Ok(lhs * rhs),
            ArithOp::Div if rhs == 0.0 => Err(ComputeError::DivisionByZero {
                expression: self.expression.to_owned(),
            }),
            ArithOp::Div => Ok(lhs / rhs),
        }
    }
}
