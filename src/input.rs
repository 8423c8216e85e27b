//! Parsing of typed coordinate input such as `(303490.09, 2770553.65)`.

use std::str::FromStr;
use thiserror::Error;

use crate::projection::PlanarCoordinate;

/// Reasons typed coordinate text can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("輸入格式應為 (x, y): expected two comma-separated numbers, found {0} part(s)")]
    WrongPartCount(usize),

    #[error("請確保座標為有效的數字: '{0}' is not a valid finite number")]
    NotANumber(String),
}

/// Parses `"(x, y)"` or `"x, y"` into a TWD97 grid coordinate.
///
/// Surrounding whitespace and a single pair of enclosing parentheses are
/// ignored. Exactly two finite numbers are accepted; `inf` and `NaN` are
/// rejected like any other non-numeric token.
pub fn parse_coordinate(input: &str) -> Result<PlanarCoordinate, InputError> {
    let trimmed = input.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed);

    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(InputError::WrongPartCount(parts.len()));
    }

    let x = parse_number(parts[0])?;
    let y = parse_number(parts[1])?;

    Ok(PlanarCoordinate::new(x, y))
}

fn parse_number(token: &str) -> Result<f64, InputError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| InputError::NotANumber(token.to_string()))
}

impl FromStr for PlanarCoordinate {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_coordinate(s)
    }
}
