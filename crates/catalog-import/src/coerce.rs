//! Cell values and the coercion rules applied to them.

use std::borrow::Cow;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::headers::fold;

/// A single loosely-typed spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Builds a text cell, mapping blank strings to [`CellValue::Empty`].
    #[must_use]
    pub fn text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Text(trimmed.to_owned())
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => !n.is_finite(),
            Self::Bool(_) => false,
        }
    }

    /// Textual rendering; whole numbers print without a fractional part.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Empty => Cow::Borrowed(""),
            Self::Text(s) => Cow::Borrowed(s.trim()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                #[allow(clippy::cast_possible_truncation)]
                let whole = *n as i64;
                Cow::Owned(whole.to_string())
            }
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Bool(b) => Cow::Owned(b.to_string()),
        }
    }

    /// Non-blank text, or `None` for empty cells.
    #[must_use]
    pub fn non_empty_text(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.as_text().into_owned())
        }
    }
}

/// Parses an identifier the way a leading-digit integer parser would:
/// `"42"`, `" 42abc"`, and `42.9` all yield 42; `"abc"` yields `None`.
#[must_use]
pub fn parse_leading_int(value: &CellValue) -> Option<i64> {
    match value {
        CellValue::Number(n) if n.is_finite() && n.abs() < 9.0e15 => {
            #[allow(clippy::cast_possible_truncation)]
            let whole = n.trunc() as i64;
            Some(whole)
        }
        CellValue::Text(s) => {
            let s = s.trim();
            let (sign, digits) = match s.as_bytes().first() {
                Some(b'-') => (-1, &s[1..]),
                Some(b'+') => (1, &s[1..]),
                _ => (1, s),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}

/// Parses a currency value.
///
/// Text is stripped of everything except digits, `,`, `.`, and `-`. When both
/// separators appear, the last one is the decimal point; a single comma on
/// its own is a decimal comma; repeated identical separators are thousands
/// separators.
///
/// # Errors
///
/// Returns `invalid price '<raw>'` unless the result is a positive number.
pub fn parse_price(value: &CellValue) -> Result<Decimal, String> {
    let invalid = || format!("invalid price '{}'", value.as_text());

    let parsed = match value {
        CellValue::Number(n) if n.is_finite() => Decimal::try_from(*n).ok(),
        CellValue::Text(s) => {
            let kept: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
                .collect();
            Decimal::from_str(&normalize_separators(&kept)).ok()
        }
        _ => None,
    };

    match parsed {
        Some(price) if price > Decimal::ZERO => Ok(price),
        _ => Err(invalid()),
    }
}

fn normalize_separators(s: &str) -> String {
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) if commas == 1 => s.replace(',', "."),
        (Some(_), None) => s.replace(',', ""),
        (None, Some(_)) if dots > 1 => s.replace('.', ""),
        _ => s.to_owned(),
    }
}

/// Rounds a price up to the next multiple of 100 (1450 → 1500, 1500 → 1500).
///
/// Returns `None` when the rounded value no longer fits in a `Decimal`.
#[must_use]
pub fn round_up_100(price: Decimal) -> Option<Decimal> {
    (price / Decimal::ONE_HUNDRED)
        .ceil()
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|rounded| rounded.normalize())
}

/// Coerces a yes/no style token. Absent or unrecognized tokens are `false`.
#[must_use]
pub fn parse_bool(value: &CellValue) -> bool {
    match value {
        CellValue::Bool(b) => *b,
        CellValue::Number(n) => *n != 0.0,
        CellValue::Text(s) => matches!(
            fold(s).as_str(),
            "true" | "verdadero" | "si" | "s" | "yes" | "y" | "1" | "x"
        ),
        CellValue::Empty => false,
    }
}
