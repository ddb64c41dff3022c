// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Delayed scalar interpretation.
//!
//! Parsing never coerces scalars; consumers call [`interpret_scalar`] when
//! they need a meaning. The precedence is fixed and deterministic:
//!
//! 1. `bool` — the literals `yes` / `no`
//! 2. `date_like` — `Y.M.D` with month 1–12 and day 1–31, leap-year unaware
//! 3. `number` — optional sign, integer or decimal
//! 4. `unknown`
//!
//! Quoted scalars interpret as `Unknown` unless the caller opts in with
//! `allow_quoted`. Numbers preserve precision: integers that fit `i32` stay
//! narrow, wider ones become `i64`, and decimals keep their source text so
//! `0.50` never silently becomes `0.5`.

use ecow::EcoString;

/// A number with source precision preserved.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarNumber {
    /// An integer within the signed 32-bit range.
    Int(i32),
    /// An integer outside the 32-bit range.
    Wide(i64),
    /// A decimal; `text` is the exact source spelling.
    Decimal { text: EcoString, value: f64 },
}

impl ScalarNumber {
    /// The numeric value as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            ScalarNumber::Int(value) => f64::from(*value),
            ScalarNumber::Wide(value) => *value as f64,
            ScalarNumber::Decimal { value, .. } => *value,
        }
    }

    /// True for `Int` and `Wide`.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, ScalarNumber::Int(_) | ScalarNumber::Wide(_))
    }
}

/// The result of interpreting a scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Unknown,
    Bool(bool),
    Number(ScalarNumber),
    DateLike { year: i32, month: u8, day: u8 },
}

impl ScalarValue {
    /// True for [`ScalarValue::Unknown`].
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, ScalarValue::Unknown)
    }

    /// The boolean value, if this is a bool.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The numeric value, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<&ScalarNumber> {
        match self {
            ScalarValue::Number(number) => Some(number),
            _ => None,
        }
    }

    /// The canonical text of the interpretation.
    ///
    /// Reinterpreting this text yields an equal [`ScalarValue`].
    #[must_use]
    pub fn canonical_text(&self) -> Option<EcoString> {
        match self {
            ScalarValue::Unknown => None,
            ScalarValue::Bool(true) => Some(EcoString::from("yes")),
            ScalarValue::Bool(false) => Some(EcoString::from("no")),
            ScalarValue::Number(ScalarNumber::Int(value)) => {
                Some(EcoString::from(value.to_string()))
            }
            ScalarValue::Number(ScalarNumber::Wide(value)) => {
                Some(EcoString::from(value.to_string()))
            }
            ScalarValue::Number(ScalarNumber::Decimal { text, .. }) => Some(text.clone()),
            ScalarValue::DateLike { year, month, day } => {
                Some(EcoString::from(format!("{year}.{month}.{day}")))
            }
        }
    }
}

/// Interprets a scalar's text.
///
/// `was_quoted` scalars return [`ScalarValue::Unknown`] unless
/// `allow_quoted` is set.
#[must_use]
pub fn interpret_scalar(text: &str, was_quoted: bool, allow_quoted: bool) -> ScalarValue {
    if was_quoted && !allow_quoted {
        return ScalarValue::Unknown;
    }

    let trimmed = text.trim();
    if let Some(value) = parse_bool(trimmed) {
        return ScalarValue::Bool(value);
    }
    if let Some((year, month, day)) = parse_date_like(trimmed) {
        return ScalarValue::DateLike { year, month, day };
    }
    if let Some(number) = parse_number(trimmed) {
        return ScalarValue::Number(number);
    }
    ScalarValue::Unknown
}

/// Parses the boolean literals `yes` / `no`.
#[must_use]
pub fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

/// Parses a `Y.M.D` date-like value, leap-year unaware.
#[must_use]
pub fn parse_date_like(text: &str) -> Option<(i32, u8, u8)> {
    let mut parts = text.splitn(3, '.');
    let year_text = parts.next()?;
    let month_text = parts.next()?;
    let day_text = parts.next()?;

    let year_digits = year_text
        .strip_prefix(['+', '-'])
        .unwrap_or(year_text);
    if year_digits.is_empty() || !year_digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if month_text.is_empty() || !month_text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if day_text.is_empty() || !day_text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = year_text.parse().ok()?;
    let month: u8 = month_text.parse().ok()?;
    let day: u8 = day_text.parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some((year, month, day))
}

/// Parses an integer or decimal number.
#[must_use]
pub fn parse_number(text: &str) -> Option<ScalarNumber> {
    if text.is_empty() {
        return None;
    }

    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() {
        return None;
    }

    let dot_count = digits.bytes().filter(|b| *b == b'.').count();
    if dot_count > 1 {
        return None;
    }

    if dot_count == 0 {
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if let Ok(value) = text.parse::<i32>() {
            return Some(ScalarNumber::Int(value));
        }
        return text.parse::<i64>().ok().map(ScalarNumber::Wide);
    }

    // Decimal: `1.5`, `1.`, `.5` — at least one digit somewhere.
    let (integral, fractional) = digits.split_once('.')?;
    if integral.is_empty() && fractional.is_empty() {
        return None;
    }
    if !integral.bytes().all(|b| b.is_ascii_digit())
        || !fractional.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    text.parse::<f64>().ok().map(|value| ScalarNumber::Decimal {
        text: EcoString::from(text),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_precedence_over_everything() {
        assert_eq!(interpret_scalar("yes", false, false), ScalarValue::Bool(true));
        assert_eq!(interpret_scalar("no", false, false), ScalarValue::Bool(false));
        // Only the exact literals; `true`/`false` are not Jomini booleans.
        assert!(interpret_scalar("true", false, false).is_unknown());
    }

    #[test]
    fn date_like_parses_within_ranges() {
        assert_eq!(
            interpret_scalar("1444.11.11", false, false),
            ScalarValue::DateLike {
                year: 1444,
                month: 11,
                day: 11
            }
        );
        // Month 13 fails the date test and two dots fail the number test.
        assert!(interpret_scalar("1444.13.11", false, false).is_unknown());
        assert!(interpret_scalar("1444.0.5", false, false).is_unknown());
        // Leap years are deliberately not checked.
        assert_eq!(
            interpret_scalar("1900.2.31", false, false),
            ScalarValue::DateLike {
                year: 1900,
                month: 2,
                day: 31
            }
        );
    }

    #[test]
    fn numbers_preserve_width_and_precision() {
        assert_eq!(
            interpret_scalar("42", false, false),
            ScalarValue::Number(ScalarNumber::Int(42))
        );
        assert_eq!(
            interpret_scalar("-17", false, false),
            ScalarValue::Number(ScalarNumber::Int(-17))
        );
        assert_eq!(
            interpret_scalar("4294967296", false, false),
            ScalarValue::Number(ScalarNumber::Wide(4_294_967_296))
        );

        let ScalarValue::Number(ScalarNumber::Decimal { text, value }) =
            interpret_scalar("0.50", false, false)
        else {
            panic!("expected decimal");
        };
        assert_eq!(text, "0.50");
        assert!((value - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn decimal_edge_spellings() {
        assert!(matches!(
            interpret_scalar(".5", false, false),
            ScalarValue::Number(ScalarNumber::Decimal { .. })
        ));
        assert!(matches!(
            interpret_scalar("5.", false, false),
            ScalarValue::Number(ScalarNumber::Decimal { .. })
        ));
        assert!(interpret_scalar(".", false, false).is_unknown());
        assert!(interpret_scalar("+", false, false).is_unknown());
    }

    #[test]
    fn quoted_scalars_default_to_unknown() {
        assert!(interpret_scalar("42", true, false).is_unknown());
        assert_eq!(
            interpret_scalar("42", true, true),
            ScalarValue::Number(ScalarNumber::Int(42))
        );
    }

    #[test]
    fn interpretation_is_idempotent() {
        for text in ["yes", "no", "42", "-17", "4294967296", "0.50", "1444.11.11"] {
            let first = interpret_scalar(text, false, false);
            let canonical = first.canonical_text().expect("canonical text");
            let second = interpret_scalar(&canonical, false, false);
            assert_eq!(first, second, "text: {text}");
        }
    }

    #[test]
    fn non_numbers_are_unknown() {
        for text in ["infantry", "a.b.c", "1.2.3.4", "--5", "1e5", ""] {
            assert!(interpret_scalar(text, false, false).is_unknown(), "{text}");
        }
    }
}
