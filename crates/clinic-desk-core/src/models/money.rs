//! Monetary amounts.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// An amount of money in cents (BRL).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest accepted amount: R$ 10 bilhões.
    pub const MAX: Money = Money(1_000_000_000_000);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Convert a decimal amount, rounding half away from zero to the
    /// nearest cent. Anything under half a cent becomes zero.
    ///
    /// Amounts beyond [`Money::MAX`] in either direction are rejected.
    pub fn from_f64(amount: f64) -> Option<Self> {
        let cents = (amount * 100.0).round();
        if !cents.is_finite() || cents.abs() > Self::MAX.0 as f64 {
            return None;
        }
        Some(Self(cents as i64))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Whether the amount lies within `-MAX..=MAX`.
    pub fn in_range(&self) -> bool {
        self.0.unsigned_abs() <= Self::MAX.0.unsigned_abs()
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Parse user input such as `50`, `50.00`, `50,00`, `R$ 1.234,56`.
    ///
    /// A lone `.` or `,` is a decimal separator. When both appear the last
    /// one is the decimal separator and the other groups thousands; repeated
    /// dots are thousands groups. Groups must be three digits wide.
    /// Rounding follows [`Money::from_f64`].
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix("R$").unwrap_or(trimmed).trim();
        if trimmed.is_empty() {
            return None;
        }

        let last_dot = trimmed.rfind('.');
        let last_comma = trimmed.rfind(',');
        let normalized = match (last_dot, last_comma) {
            (Some(dot), Some(comma)) if comma > dot => {
                format!("{}.{}", ungroup(&trimmed[..comma], '.')?, &trimmed[comma + 1..])
            }
            (Some(dot), Some(_)) => {
                format!("{}.{}", ungroup(&trimmed[..dot], ',')?, &trimmed[dot + 1..])
            }
            (None, Some(_)) if trimmed.matches(',').count() > 1 => return None,
            (None, Some(_)) => trimmed.replace(',', "."),
            (Some(_), None) if trimmed.matches('.').count() > 1 => ungroup(trimmed, '.')?,
            _ => trimmed.to_string(),
        };

        // Reject exponents and other forms f64::from_str would accept.
        if !normalized
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-')
        {
            return None;
        }

        normalized.parse::<f64>().ok().and_then(Self::from_f64)
    }
}

/// Remove thousands separators from an integer part, e.g. `1.234.567`.
fn ungroup(integer: &str, separator: char) -> Option<String> {
    let (sign, digits) = match integer.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer),
    };

    let mut groups = digits.split(separator);
    let lead = groups.next().filter(|g| (1..=3).contains(&g.len()))?;
    let mut out = format!("{}{}", sign, lead);
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        out.push_str(group);
    }
    Some(out)
}

/// Saturating; use [`Money::checked_add`] where overflow must be seen.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    /// Formats as Brazilian currency, e.g. `R$ 1.234,56`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = (abs / 100).to_string();
        let cents = abs % 100;

        let mut grouped = String::with_capacity(units.len() + units.len() / 3);
        for (i, digit) in units.chars().enumerate() {
            if i > 0 && (units.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }

        write!(f, "{}R$ {},{:02}", sign, grouped, cents)
    }
}
