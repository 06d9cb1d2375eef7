// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Exact-precision decimal values.
//!
//! Parameter bounds and assigned values are exchanged as decimal numbers
//! whose digits must survive a round trip untouched: a bound of `0.1` has to
//! come back as `0.1`, and a 30 digit integer must not be squeezed through an
//! `f64`. [`Decimal`] keeps the literal text of the number (via
//! `serde_json::Number` with `arbitrary_precision`) and only converts to
//! binary floating point when a caller explicitly asks for it.
//!
//! On the wire a decimal may arrive either as a JSON number or as a JSON
//! string containing a number; it is always written back as a JSON number.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};
use thiserror::Error;

/// A decimal number preserved exactly as it was written.
///
/// Equality is textual: `1.0` and `1.00` are different values, matching how
/// the server echoes back what it was sent. Use [`Decimal::cmp_value`] to
/// order by numeric value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal(Number);

/// Returned when text does not hold a JSON-style decimal number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal value: {0:?}")]
pub struct InvalidDecimal(pub String);

impl Decimal {
    /// The value as an `f64`, possibly losing precision.
    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_f64()
    }

    /// The value as an `i64`, if it is written as an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.as_i64()
    }

    /// Whether the literal has no fraction or exponent part.
    pub fn is_integer(&self) -> bool {
        !self
            .0
            .to_string()
            .contains(|c: char| matches!(c, '.' | 'e' | 'E'))
    }

    /// Borrow the underlying JSON number.
    pub fn as_number(&self) -> &Number {
        &self.0
    }

    /// Compare by numeric value, digit for digit.
    ///
    /// No conversion to `f64` takes place, so values that only differ past
    /// the twentieth digit still order correctly. Values written differently
    /// but numerically equal, such as `1.0` and `1.00`, compare `Equal`.
    pub fn cmp_value(&self, other: &Decimal) -> Ordering {
        let a = Digits::parse(&self.0.to_string());
        let b = Digits::parse(&other.0.to_string());

        match a.sign.cmp(&b.sign) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        let magnitude = a
            .point
            .cmp(&b.point)
            .then_with(|| a.significand.cmp(&b.significand));
        match a.sign {
            Ordering::Less => magnitude.reverse(),
            Ordering::Equal => Ordering::Equal,
            Ordering::Greater => magnitude,
        }
    }
}

/// A number in the form `0.<significand> * 10^point`.
///
/// `significand` has neither leading nor trailing zeros, which makes two
/// magnitudes with the same `point` comparable as plain strings.
struct Digits {
    sign: Ordering,
    point: i64,
    significand: String,
}

impl Digits {
    fn parse(text: &str) -> Self {
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
            Some((m, e)) => (m, parse_exponent(e)),
            None => (unsigned, 0),
        };
        let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));

        let all: String = int.chars().chain(frac.chars()).collect();
        let trimmed = all.trim_start_matches('0');
        let skipped = all.len() - trimmed.len();
        let significand = trimmed.trim_end_matches('0').to_string();

        if significand.is_empty() {
            return Self {
                sign: Ordering::Equal,
                point: 0,
                significand,
            };
        }

        // Integer digits, less the zeros stripped from the front
        let point = (int.len() as i64)
            .saturating_sub(skipped as i64)
            .saturating_add(exponent);

        Self {
            sign: if negative {
                Ordering::Less
            } else {
                Ordering::Greater
            },
            point,
            significand,
        }
    }
}

/// Exponents too large for `i64` saturate; no finite bound gets near them.
fn parse_exponent(text: &str) -> i64 {
    text.parse().unwrap_or(if text.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

impl FromStr for Decimal {
    type Err = InvalidDecimal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Number::from_str(s.trim())
            .map(Decimal)
            .map_err(|_| InvalidDecimal(s.to_string()))
    }
}

impl TryFrom<f64> for Decimal {
    type Error = InvalidDecimal;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Number::from_f64(value)
            .map(Decimal)
            .ok_or_else(|| InvalidDecimal(value.to_string()))
    }
}

macro_rules! decimal_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Decimal {
                fn from(value: $t) -> Self {
                    Decimal(Number::from(value))
                }
            }
        )*
    };
}

decimal_from_int!(i32, i64, u32, u64);

impl From<Decimal> for Number {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Going through `Value` keeps arbitrary precision numbers intact
        // whether the literal was quoted or not.
        match Value::deserialize(deserializer)? {
            Value::Number(n) => Ok(Decimal(n)),
            Value::String(s) => s
                .parse()
                .map_err(|_| de::Error::invalid_value(Unexpected::Str(&s), &"a decimal number")),
            other => Err(de::Error::invalid_type(
                unexpected(&other),
                &"a decimal number or numeric string",
            )),
        }
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
        Value::Number(_) | Value::String(_) => Unexpected::Other("decimal"),
    }
}
