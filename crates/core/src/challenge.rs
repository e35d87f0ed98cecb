//! Arithmetic login challenge ("12 + 7 = ?").

use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;

static CHALLENGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(-?\d+)\s*([^\s\d])\s*(-?\d+)\s*=\s*\?").expect("challenge pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChallengeError {
    #[error("no challenge found in {0:?}")]
    Unrecognized(String),

    #[error("unsupported operator {0:?}")]
    UnsupportedOperator(String),

    #[error("operand out of range: {0}")]
    OperandOutOfRange(String),

    #[error("answer overflows")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
}

impl Operator {
    fn from_symbol(symbol: &str) -> Result<Self, ChallengeError> {
        match symbol {
            "+" => Ok(Operator::Add),
            "-" | "\u{2212}" => Ok(Operator::Subtract),
            "*" | "x" | "\u{00d7}" => Ok(Operator::Multiply),
            other => Err(ChallengeError::UnsupportedOperator(other.to_string())),
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
        }
    }
}

/// A parsed challenge question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeQuestion {
    pub operand_a: i64,
    pub operator: Operator,
    pub operand_b: i64,
}

impl ChallengeQuestion {
    /// Find and parse the first `a op b = ?` expression in `text`.
    ///
    /// The text may be a bare question or a whole page fragment around it.
    pub fn parse(text: &str) -> Result<Self, ChallengeError> {
        let caps = CHALLENGE_RE
            .captures(text)
            .ok_or_else(|| ChallengeError::Unrecognized(truncate(text)))?;

        let operand = |idx: usize| -> Result<i64, ChallengeError> {
            let raw = &caps[idx];
            raw.parse::<i64>()
                .map_err(|_| ChallengeError::OperandOutOfRange(raw.to_string()))
        };

        Ok(Self {
            operand_a: operand(1)?,
            operator: Operator::from_symbol(&caps[2])?,
            operand_b: operand(3)?,
        })
    }

    pub fn answer(&self) -> Result<i64, ChallengeError> {
        let result = match self.operator {
            Operator::Add => self.operand_a.checked_add(self.operand_b),
            Operator::Subtract => self.operand_a.checked_sub(self.operand_b),
            Operator::Multiply => self.operand_a.checked_mul(self.operand_b),
        };
        result.ok_or(ChallengeError::Overflow)
    }
}

impl fmt::Display for ChallengeQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} = ?",
            self.operand_a,
            self.operator.symbol(),
            self.operand_b
        )
    }
}

/// Parse and answer a challenge in one step.
pub fn solve(text: &str) -> Result<i64, ChallengeError> {
    ChallengeQuestion::parse(text)?.answer()
}

fn truncate(text: &str) -> String {
    text.chars().take(80).collect()
}
