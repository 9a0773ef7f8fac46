#![forbid(unsafe_code)]

//! Value expression parser.
//!
//! Turns the raw text of a declared value into a [`FluidValue`]: outer groups
//! split on top-level commas, each group split on top-level whitespace into
//! [`Node`] trees.
//!
//! # Grammar
//!
//! ```text
//! value    := group ("," group)*
//! group    := node (ws node)*
//! node     := position | function | "(" arith ")" | number unit? | keyword
//! function := ("calc" | "min" | "max" | "clamp" | "minmax") "(" args ")"
//! arith    := node (op node)*
//! ```
//!
//! Inside a function body `*` and `/` always split operands. `+` and `-`
//! split only after a complete operand: whitespace, a `)` or a number with
//! its unit must come right before them. `max-content`, `-5px` and `1e-3`
//! stay intact, while `10px+5px` splits.
//!
//! # Failure Modes
//!
//! Parsing never fails. Anything that is not a position keyword, a known
//! function or a number with an alphabetic / `%` unit becomes a
//! [`Node::Keyword`] leaf and is resolved later by measurement.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

static NUMERIC_LEAF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)([a-zA-Z%]*)$")
        .expect("numeric leaf pattern compiles")
});

/// Length unit attached to a numeric leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Unit {
    Px,
    Em,
    Rem,
    Vw,
    Vh,
    Percent,
    /// Any other alphabetic unit. Kept so conversion can report it.
    Other(String),
}

impl Unit {
    /// Parse a unit suffix. An empty suffix means pixels.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "" | "px" => Self::Px,
            "em" => Self::Em,
            "rem" => Self::Rem,
            "vw" => Self::Vw,
            "vh" => Self::Vh,
            "%" => Self::Percent,
            other => Self::Other(other.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Px => "px",
            Self::Em => "em",
            Self::Rem => "rem",
            Self::Vw => "vw",
            Self::Vh => "vh",
            Self::Percent => "%",
            Self::Other(unit) => unit.as_str(),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary arithmetic operator inside `calc()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            '*' => Some(Self::Mul),
            '/' => Some(Self::Div),
            _ => None,
        }
    }

    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }
}

/// Math functions recognised by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FunctionKind {
    Calc,
    Min,
    Max,
    Clamp,
    MinMax,
}

impl FunctionKind {
    /// Case-insensitive lookup by function name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "calc" => Some(Self::Calc),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "clamp" => Some(Self::Clamp),
            "minmax" => Some(Self::MinMax),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Calc => "calc",
            Self::Min => "min",
            Self::Max => "max",
            Self::Clamp => "clamp",
            Self::MinMax => "minmax",
        }
    }
}

/// One entry of a function's operand list.
///
/// `calc()` keeps operators interleaved with operands; the other functions
/// hold one [`Operand::Node`] per comma-separated argument.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operand {
    Node(Node),
    Op(ArithOp),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => fmt::Display::fmt(node, f),
            Self::Op(op) => write!(f, "{}", op.symbol()),
        }
    }
}

/// A parsed value leaf or function call.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Node {
    Length { value: f64, unit: Unit },
    Keyword(String),
    Function { kind: FunctionKind, operands: Vec<Operand> },
}

impl Node {
    #[must_use]
    pub fn length(value: f64, unit: Unit) -> Self {
        Self::Length { value, unit }
    }

    #[must_use]
    pub fn px(value: f64) -> Self {
        Self::length(value, Unit::Px)
    }

    #[must_use]
    pub fn percent(value: f64) -> Self {
        Self::length(value, Unit::Percent)
    }

    #[must_use]
    pub fn keyword(text: impl Into<String>) -> Self {
        Self::Keyword(text.into())
    }

    /// True when this node, or anything nested inside it, is a percentage.
    #[must_use]
    pub fn has_percent(&self) -> bool {
        match self {
            Self::Length { unit, .. } => *unit == Unit::Percent,
            Self::Keyword(_) => false,
            Self::Function { operands, .. } => operands.iter().any(|operand| match operand {
                Operand::Node(node) => node.has_percent(),
                Operand::Op(_) => false,
            }),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length { value, unit } => write!(f, "{value}{unit}"),
            Self::Keyword(keyword) => f.write_str(keyword),
            Self::Function { kind, operands } => {
                write!(f, "{}(", kind.name())?;
                let separator = if *kind == FunctionKind::Calc { " " } else { ", " };
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    fmt::Display::fmt(operand, f)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Space-separated values of one comma group.
pub type ValueGroup = Vec<Node>;

/// Comma groups of space-separated nodes.
pub type FluidValue = Vec<ValueGroup>;

/// Parse a raw declared value. Empty tokens and empty groups are dropped.
#[must_use]
pub fn parse_value(raw: &str) -> FluidValue {
    split_top_level(raw, |c| c == ',')
        .into_iter()
        .map(|group| {
            split_top_level(group, char::is_whitespace)
                .into_iter()
                .map(parse_node)
                .collect::<ValueGroup>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

/// Parse a single whitespace-free token.
#[must_use]
pub fn parse_node(token: &str) -> Node {
    let token = token.trim();
    if let Some(node) = position_keyword(token) {
        return node;
    }
    if let Some((kind, body)) = function_call(token) {
        return parse_function(kind, body);
    }
    if let Some(body) = parenthesized(token) {
        return parse_function(FunctionKind::Calc, body);
    }
    parse_leaf(token)
}

/// Render a value back to CSS text.
#[must_use]
pub fn format_value(value: &FluidValue) -> String {
    value
        .iter()
        .map(|group| {
            group
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn position_keyword(token: &str) -> Option<Node> {
    match token.to_ascii_lowercase().as_str() {
        "left" | "top" => Some(Node::percent(0.0)),
        "right" | "bottom" => Some(Node::percent(100.0)),
        _ => None,
    }
}

/// Index of the `)` closing the `(` at `open`.
fn matching_close(token: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in token[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn function_call(token: &str) -> Option<(FunctionKind, &str)> {
    let open = token.find('(')?;
    let kind = FunctionKind::from_name(&token[..open])?;
    let close = matching_close(token, open)?;
    (close + 1 == token.len()).then(|| (kind, &token[open + 1..close]))
}

fn parenthesized(token: &str) -> Option<&str> {
    if !token.starts_with('(') {
        return None;
    }
    let close = matching_close(token, 0)?;
    (close + 1 == token.len()).then(|| &token[1..close])
}

fn parse_function(kind: FunctionKind, body: &str) -> Node {
    let operands = match kind {
        FunctionKind::Calc => parse_arithmetic(body),
        _ => split_top_level(body, |c| c == ',')
            .into_iter()
            .map(|arg| Operand::Node(parse_argument(arg)))
            .collect(),
    };
    Node::Function { kind, operands }
}

/// A function argument containing operators becomes an implicit `calc()`.
fn parse_argument(arg: &str) -> Node {
    let mut operands = parse_arithmetic(arg);
    if let [Operand::Node(_)] = operands.as_slice() {
        if let Some(Operand::Node(node)) = operands.pop() {
            return node;
        }
    }
    Node::Function {
        kind: FunctionKind::Calc,
        operands,
    }
}

fn parse_arithmetic(expr: &str) -> Vec<Operand> {
    let mut operands = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut prev: Option<char> = None;

    for (i, c) in expr.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            ',' => {
                push_operand(&mut operands, &expr[start..i]);
                start = i + 1;
            }
            '*' | '/' | '+' | '-' => {
                let binary = matches!(c, '*' | '/') || closes_operand(&expr[start..i], prev);
                if let Some(op) = ArithOp::from_char(c).filter(|_| binary) {
                    push_operand(&mut operands, &expr[start..i]);
                    operands.push(Operand::Op(op));
                    start = i + 1;
                }
            }
            _ => {}
        }
        prev = Some(c);
    }
    push_operand(&mut operands, &expr[start..]);
    operands
}

/// Whether a `+` or `-` after `pending` is a binary operator rather than a
/// sign or part of a hyphenated keyword.
fn closes_operand(pending: &str, prev: Option<char>) -> bool {
    let pending = pending.trim();
    if pending.is_empty() {
        return false;
    }
    if prev.is_some_and(|c| c.is_whitespace() || c == ')') {
        return true;
    }
    let mut tail = pending.chars().rev();
    let exponent = matches!(tail.next(), Some('e' | 'E'))
        && tail.next().is_some_and(|c| c.is_ascii_digit());
    !exponent && NUMERIC_LEAF.is_match(pending)
}

fn push_operand(operands: &mut Vec<Operand>, raw: &str) {
    let raw = raw.trim();
    if !raw.is_empty() {
        operands.push(Operand::Node(parse_node(raw)));
    }
}

fn parse_leaf(token: &str) -> Node {
    if let Some(caps) = NUMERIC_LEAF.captures(token) {
        if let Ok(value) = caps[1].parse::<f64>() {
            let unit = caps.get(2).map_or(Unit::Px, |m| Unit::parse(m.as_str()));
            return Node::Length { value, unit };
        }
    }
    Node::Keyword(token.to_owned())
}

/// Split on `is_separator` outside parentheses. Pieces are trimmed and
/// empty pieces dropped.
fn split_top_level(input: &str, is_separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && is_separator(c) => {
                pieces.push(input[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(input[start..].trim());
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc(operands: Vec<Operand>) -> Node {
        Node::Function {
            kind: FunctionKind::Calc,
            operands,
        }
    }

    fn n(node: Node) -> Operand {
        Operand::Node(node)
    }

    #[test]
    fn plain_lengths_default_to_px() {
        assert_eq!(parse_value("16px"), vec![vec![Node::px(16.0)]]);
        assert_eq!(parse_value("16"), vec![vec![Node::px(16.0)]]);
        assert_eq!(parse_value("1.5rem"), vec![vec![Node::length(1.5, Unit::Rem)]]);
        assert_eq!(parse_value(".5em"), vec![vec![Node::length(0.5, Unit::Em)]]);
        assert_eq!(parse_value("-4px"), vec![vec![Node::px(-4.0)]]);
    }

    #[test]
    fn groups_and_values_split_at_top_level() {
        let value = parse_value("10px 20px, calc(1px + 2px) auto");
        assert_eq!(value.len(), 2);
        assert_eq!(value[0], vec![Node::px(10.0), Node::px(20.0)]);
        assert_eq!(value[1].len(), 2);
        assert_eq!(value[1][1], Node::keyword("auto"));
    }

    #[test]
    fn empty_tokens_and_groups_are_dropped() {
        assert_eq!(
            parse_value("  10px   ,  , 5px "),
            vec![vec![Node::px(10.0)], vec![Node::px(5.0)]]
        );
        assert!(parse_value("   ").is_empty());
    }

    #[test]
    fn position_keywords_become_percentages() {
        assert_eq!(
            parse_value("left bottom"),
            vec![vec![Node::percent(0.0), Node::percent(100.0)]]
        );
        assert_eq!(parse_value("TOP"), vec![vec![Node::percent(0.0)]]);
        assert_eq!(parse_value("center"), vec![vec![Node::keyword("center")]]);
    }

    #[test]
    fn calc_keeps_operators_interleaved() {
        let value = parse_value("calc(100% - 2 * 10px)");
        assert_eq!(
            value[0][0],
            calc(vec![
                n(Node::percent(100.0)),
                Operand::Op(ArithOp::Sub),
                n(Node::px(2.0)),
                Operand::Op(ArithOp::Mul),
                n(Node::px(10.0)),
            ])
        );
    }

    #[test]
    fn nested_parentheses_become_calc_groups() {
        let value = parse_value("calc((1px + 2px) * 3)");
        assert_eq!(
            value[0][0],
            calc(vec![
                n(calc(vec![n(Node::px(1.0)), Operand::Op(ArithOp::Add), n(Node::px(2.0))])),
                Operand::Op(ArithOp::Mul),
                n(Node::px(3.0)),
            ])
        );
    }

    #[test]
    fn function_arguments_with_operators_become_implicit_calc() {
        let value = parse_value("min(10px, 50% - 2rem)");
        let Node::Function { kind, operands } = &value[0][0] else {
            panic!("expected a function node");
        };
        assert_eq!(*kind, FunctionKind::Min);
        assert_eq!(operands.len(), 2);
        assert_eq!(operands[0], n(Node::px(10.0)));
        assert_eq!(
            operands[1],
            n(calc(vec![
                n(Node::percent(50.0)),
                Operand::Op(ArithOp::Sub),
                n(Node::length(2.0, Unit::Rem)),
            ]))
        );
    }

    #[test]
    fn hyphenated_keywords_and_signed_numbers_are_not_split() {
        let value = parse_value("minmax(max-content, 1fr)");
        let Node::Function { operands, .. } = &value[0][0] else {
            panic!("expected a function node");
        };
        assert_eq!(operands[0], n(Node::keyword("max-content")));
        assert_eq!(operands[1], n(Node::length(1.0, Unit::Other("fr".into()))));

        let value = parse_value("calc(10px - -5px)");
        let Node::Function { operands, .. } = &value[0][0] else {
            panic!("expected a function node");
        };
        assert_eq!(operands.len(), 3);
        assert_eq!(operands[2], n(Node::px(-5.0)));
    }

    #[test]
    fn operators_without_spaces_split_after_numbers() {
        assert_eq!(
            parse_value("calc(10px+5px)"),
            vec![vec![calc(vec![
                n(Node::px(10.0)),
                Operand::Op(ArithOp::Add),
                n(Node::px(5.0)),
            ])]]
        );
        assert_eq!(
            parse_value("calc(50%-2em)"),
            vec![vec![calc(vec![
                n(Node::percent(50.0)),
                Operand::Op(ArithOp::Sub),
                n(Node::length(2.0, Unit::Em)),
            ])]]
        );

        let value = parse_value("calc(1e-3px + 2px)");
        let Node::Function { operands, .. } = &value[0][0] else {
            panic!("expected a function node");
        };
        assert_eq!(operands.len(), 3);
        assert_eq!(operands[0], n(Node::px(0.001)));
    }

    #[test]
    fn unknown_functions_are_keywords() {
        assert_eq!(
            parse_value("var(--gap)"),
            vec![vec![Node::keyword("var(--gap)")]]
        );
        assert_eq!(parse_value("calc(1px"), vec![vec![Node::keyword("calc(1px")]]);
    }

    #[test]
    fn percent_detection_reaches_nested_operands() {
        assert!(parse_node("clamp(1rem, calc(10% + 1px), 3rem)").has_percent());
        assert!(!parse_node("clamp(1rem, 2vw, 3rem)").has_percent());
    }

    #[test]
    fn display_renders_css_text() {
        assert_eq!(parse_node("calc(100% - 20px)").to_string(), "calc(100% - 20px)");
        assert_eq!(parse_node("minmax(100px,1fr)").to_string(), "minmax(100px, 1fr)");
        assert_eq!(format_value(&parse_value("1px 2px,3px")), "1px 2px, 3px");
    }
}
