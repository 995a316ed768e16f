// Decimal text codec used at the virtual file boundary.
use std::fmt;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// No digit follows the optional whitespace and sign.
    Malformed,
    /// The digits do not fit in an `i64`.
    OutOfRange,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Malformed => write!(f, "no leading decimal integer"),
            ParseError::OutOfRange => write!(f, "integer does not fit in 64 bits"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::new(ErrorKind::MalformedInput)
            .with_message(err.to_string())
            .with_source(err)
    }
}

pub fn encode(value: i64) -> String {
    format!("{value}\n")
}

pub fn render_lines(values: &[i64]) -> String {
    let mut out = String::with_capacity(values.len() * 4);
    for value in values {
        out.push_str(&encode(*value));
    }
    out
}

/// Parses the leading integer of `input`, ignoring anything after it.
///
/// Leading ASCII whitespace is skipped and one `+` or `-` is accepted.
pub fn decode(input: &[u8]) -> Result<i64, ParseError> {
    let mut pos = 0;
    while pos < input.len() && input[pos].is_ascii_whitespace() {
        pos += 1;
    }

    let mut negative = false;
    if pos < input.len() && (input[pos] == b'+' || input[pos] == b'-') {
        negative = input[pos] == b'-';
        pos += 1;
    }

    let digits_start = pos;
    // Accumulate on the negative side so i64::MIN parses without overflow.
    let mut acc: i64 = 0;
    while pos < input.len() && input[pos].is_ascii_digit() {
        let digit = i64::from(input[pos] - b'0');
        acc = acc
            .checked_mul(10)
            .and_then(|value| value.checked_sub(digit))
            .ok_or(ParseError::OutOfRange)?;
        pos += 1;
    }
    if pos == digits_start {
        return Err(ParseError::Malformed);
    }

    if negative {
        Ok(acc)
    } else {
        acc.checked_neg().ok_or(ParseError::OutOfRange)
    }
}
