//! Calculator capability: evaluates one-line arithmetic formulas.
//!
//! Supports `+`, `-`, `*`, `/`, `%`, `**` (right-associative power),
//! parentheses, unary minus and decimal numbers. Precedence follows the
//! usual convention, so `-2 ** 2` is `-4` and `7 % -3` is `-2` (the
//! remainder takes the sign of the divisor).

use async_trait::async_trait;
use chatty_core::error::ToolError;
use chatty_core::tool::{Tool, ToolOutput};
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "A calculator that evaluates basic one-line arithmetic: + - * / % ** and parentheses."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "formula": {
                    "type": "string",
                    "description": "The arithmetic to evaluate, e.g. '2 + 10' or '(3 ** 2) % 4'"
                }
            },
            "required": ["formula"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let formula = arguments["formula"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'formula' argument".into()))?;

        Ok(match evaluate(formula) {
            Ok(value) => ToolOutput {
                success: true,
                output: format_number(value),
                data: Some(serde_json::json!({ "result": value })),
            },
            // Bad formulas are reported to the model, not raised.
            Err(e) => ToolOutput {
                success: false,
                output: format!("Error: {e}"),
                data: None,
            },
        })
    }
}

/// Render integral values without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("missing closing parenthesis")]
    UnclosedParen,

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,

    #[error("formula nests deeper than {} levels", MAX_DEPTH)]
    TooDeep,
}

/// Evaluate an arithmetic formula.
pub fn evaluate(formula: &str) -> Result<f64, CalcError> {
    let tokens = Lexer::new(formula).collect::<Result<Vec<_>, _>>()?;
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let value = parser.expr(0, 0)?;
    if let Some(tok) = parser.tokens.get(parser.pos) {
        return Err(CalcError::UnexpectedToken(tok.describe()));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tok {
    Num(f64),
    Op(BinOp),
    Open,
    Close,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Num(n) => format!("number {n}"),
            Tok::Op(op) => format!("operator '{}'", op.symbol()),
            Tok::Open => "'('".into(),
            Tok::Close => "')'".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Pow => "**",
        }
    }

    /// (left, right) binding power. Right < left means right-associative.
    fn binding_power(self) -> (u8, u8) {
        match self {
            BinOp::Add | BinOp::Sub => (1, 2),
            BinOp::Mul | BinOp::Div | BinOp::Rem => (3, 4),
            BinOp::Pow => (6, 5),
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, CalcError> {
        Ok(match self {
            BinOp::Add => lhs + rhs,
            BinOp::Sub => lhs - rhs,
            BinOp::Mul => lhs * rhs,
            BinOp::Div if rhs == 0.0 => return Err(CalcError::DivisionByZero),
            BinOp::Div => lhs / rhs,
            BinOp::Rem if rhs == 0.0 => return Err(CalcError::DivisionByZero),
            BinOp::Rem => {
                let r = lhs % rhs;
                if r != 0.0 && (r < 0.0) != (rhs < 0.0) { r + rhs } else { r }
            }
            BinOp::Pow => lhs.powf(rhs),
        })
    }
}

/// Operand of unary minus binds tighter than `*` but looser than `**`.
const PREFIX_BP: u8 = 5;

/// Nesting limit for parentheses, signs and `**` chains. Formulas come from
/// the model, and the parser recurses once per level.
pub const MAX_DEPTH: usize = 256;

struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, chars: src.char_indices().peekable() }
    }

    fn number(&mut self, start: usize) -> Result<Tok, CalcError> {
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if !(c.is_ascii_digit() || c == '.') {
                break;
            }
            end = i + c.len_utf8();
            self.chars.next();
        }
        let text = &self.src[start..end];
        text.parse()
            .map(Tok::Num)
            .map_err(|_| CalcError::InvalidNumber(text.to_string()))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, CalcError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}

        let &(offset, ch) = self.chars.peek()?;
        if ch.is_ascii_digit() || ch == '.' {
            return Some(self.number(offset));
        }
        self.chars.next();

        let tok = match ch {
            '+' => Tok::Op(BinOp::Add),
            '-' => Tok::Op(BinOp::Sub),
            '*' if self.chars.next_if(|&(_, c)| c == '*').is_some() => Tok::Op(BinOp::Pow),
            '*' => Tok::Op(BinOp::Mul),
            '/' => Tok::Op(BinOp::Div),
            '%' => Tok::Op(BinOp::Rem),
            '(' => Tok::Open,
            ')' => Tok::Close,
            ch => return Some(Err(CalcError::UnexpectedChar { ch, offset })),
        };
        Some(Ok(tok))
    }
}

struct Parser<'a> {
    tokens: &'a [Tok],
    pos: usize,
}

impl Parser<'_> {
    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).copied();
        self.pos += usize::from(tok.is_some());
        tok
    }

    /// Precedence climbing: parse while operators bind at least `min_bp`.
    fn expr(&mut self, min_bp: u8, depth: usize) -> Result<f64, CalcError> {
        if depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        let mut lhs = match self.next().ok_or(CalcError::UnexpectedEnd)? {
            Tok::Num(n) => n,
            Tok::Open => {
                let inner = self.expr(0, depth + 1)?;
                match self.next() {
                    Some(Tok::Close) => inner,
                    _ => return Err(CalcError::UnclosedParen),
                }
            }
            Tok::Op(BinOp::Sub) => -self.expr(PREFIX_BP, depth + 1)?,
            Tok::Op(BinOp::Add) => self.expr(PREFIX_BP, depth + 1)?,
            tok @ (Tok::Op(_) | Tok::Close) => return Err(CalcError::UnexpectedToken(tok.describe())),
        };

        while let Some(Tok::Op(op)) = self.tokens.get(self.pos).copied() {
            let (left_bp, right_bp) = op.binding_power();
            if left_bp < min_bp {
                break;
            }
            self.pos += 1;
            let rhs = self.expr(right_bp, depth + 1)?;
            lhs = op.apply(lhs, rhs)?;
        }

        Ok(lhs)
    }
}
