use std::{
    fmt,
    ops::{Add, AddAssign, Sub, SubAssign},
};

use crate::EngineError;

/// Signed money amount represented as **integer minor units** (centimes).
///
/// Use this type for **all** monetary values crossing the engine boundary
/// (SMS amounts, user-entered amounts, aggregates) to avoid floating-point
/// drift. Entity rows store the raw `i64` from [`Money::minor`].
///
/// The value is signed:
/// - positive = contribution / increase
/// - negative = expense / decrease
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_500_00);
/// assert_eq!(amount.minor(), 1_250_000);
/// assert_eq!(amount.to_string(), "12,500 RWF");
/// ```
///
/// Parsing notification text (tolerates `,` thousands grouping; rejects more
/// than 2 decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!(Money::parse_grouped("12,500").unwrap().minor(), 1_250_000);
/// assert_eq!(Money::parse_grouped("1,234.50").unwrap().minor(), 123_450);
/// assert!(Money::parse_grouped("12.345").is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Parses a decimal amount as it appears in bank and mobile-money
    /// notifications.
    ///
    /// Accepts `12500`, `12,500` and `1,234.50`. Grouping separators are
    /// stripped before parsing, so misplaced groups are tolerated the same
    /// way the notification senders themselves are inconsistent about them.
    ///
    /// Validation rules:
    /// - max 2 fractional digits (rejects `12.345`)
    /// - rejects empty/invalid strings and negative input (notification
    ///   amounts are always unsigned; direction comes from classification)
    pub fn parse_grouped(s: &str) -> Result<Self, EngineError> {
        let empty = || EngineError::Validation("empty amount".to_string());
        let invalid = || EngineError::Validation("invalid amount".to_string());
        let overflow = || EngineError::Validation("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let normalized = trimmed.replace(',', "");
        let mut parts = normalized.split('.');
        let units_str = parts.next().ok_or_else(invalid)?;
        let minor_str = parts.next();

        if parts.next().is_some() {
            return Err(invalid());
        }

        if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = units_str.parse().map_err(|_| invalid())?;

        let minor: i64 = match minor_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                match frac.len() {
                    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                    2 => frac.parse::<i64>().map_err(|_| invalid())?,
                    _ => {
                        return Err(EngineError::Validation("too many decimals".to_string()));
                    }
                }
            }
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(overflow)?;

        Ok(Money(total))
    }
}

impl fmt::Display for Money {
    /// Formats as grouped RWF, dropping the fraction when it is zero
    /// (`12,500 RWF`, `1,234.50 RWF`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let minor = abs % 100;

        let digits = units.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        if minor == 0 {
            write!(f, "{sign}{grouped} RWF")
        } else {
            write!(f, "{sign}{grouped}.{minor:02} RWF")
        }
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_rwf() {
        assert_eq!(Money::new(0).to_string(), "0 RWF");
        assert_eq!(Money::new(50).to_string(), "0.50 RWF");
        assert_eq!(Money::new(1_250_000).to_string(), "12,500 RWF");
        assert_eq!(Money::new(123_450).to_string(), "1,234.50 RWF");
        assert_eq!(Money::new(-1_250_000).to_string(), "-12,500 RWF");
    }

    #[test]
    fn parse_accepts_grouping() {
        assert_eq!(Money::parse_grouped("12500").unwrap().minor(), 1_250_000);
        assert_eq!(Money::parse_grouped("12,500").unwrap().minor(), 1_250_000);
        assert_eq!(Money::parse_grouped("1,234.50").unwrap().minor(), 123_450);
        assert_eq!(Money::parse_grouped("10.5").unwrap().minor(), 1050);
        assert_eq!(Money::parse_grouped("  2.30 ").unwrap().minor(), 230);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Money::parse_grouped("").is_err());
        assert!(Money::parse_grouped("12.345").is_err());
        assert!(Money::parse_grouped("12.3.4").is_err());
        assert!(Money::parse_grouped("abc").is_err());
        assert!(Money::parse_grouped("-5").is_err());
    }
}
