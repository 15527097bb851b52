//! Tax-withheld-at-source (TDS) arithmetic.
//!
//! A portion of an invoice amount is withheld from the vendor for tax
//! remittance. Amounts are integer **minor units** (see the entity modules),
//! so "round up to the currency's minor-unit precision" reduces to taking the
//! ceiling of `amount * rate / 100` in integer math — no floating point.
//!
//! The rounding policy is a property of the invoice, and is captured again on
//! every payment row at record time: changing an invoice's policy later must
//! never rewrite the arithmetic of an already-settled payment.

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// How the withheld amount is rounded to a whole minor unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TdsRounding {
    /// Round half up to the nearest minor unit.
    #[default]
    Nearest,
    /// Always round up (never withhold less than the computed fraction).
    RoundUp,
}

impl TdsRounding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::RoundUp => "round_up",
        }
    }
}

impl TryFrom<&str> for TdsRounding {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "nearest" => Ok(Self::Nearest),
            "round_up" => Ok(Self::RoundUp),
            other => Err(EngineError::Validation(format!(
                "invalid TDS rounding policy: {other}"
            ))),
        }
    }
}

/// Result of a withholding computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TdsBreakdown {
    pub withheld_minor: i64,
    pub payable_minor: i64,
}

/// Splits `amount_minor` into withheld and payable parts.
///
/// A missing or non-positive rate withholds nothing.
#[must_use]
pub fn calculate(
    amount_minor: i64,
    rate_percent: Option<i64>,
    rounding: TdsRounding,
) -> TdsBreakdown {
    let rate = match rate_percent {
        Some(rate) if rate > 0 => rate,
        _ => {
            return TdsBreakdown {
                withheld_minor: 0,
                payable_minor: amount_minor,
            };
        }
    };

    let product = amount_minor.saturating_mul(rate);
    let withheld_minor = match rounding {
        TdsRounding::RoundUp => (product + 99).div_euclid(100),
        TdsRounding::Nearest => (product + 50).div_euclid(100),
    };

    TdsBreakdown {
        withheld_minor,
        payable_minor: amount_minor - withheld_minor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_rate_divides_cleanly() {
        let breakdown = calculate(1000, Some(10), TdsRounding::RoundUp);
        assert_eq!(breakdown.withheld_minor, 100);
        assert_eq!(breakdown.payable_minor, 900);
    }

    #[test]
    fn round_up_takes_the_ceiling() {
        // 333 * 7% = 23.31, withheld rounds up to 24.
        let breakdown = calculate(333, Some(7), TdsRounding::RoundUp);
        assert_eq!(breakdown.withheld_minor, 24);
        assert_eq!(breakdown.payable_minor, 309);
    }

    #[test]
    fn nearest_rounds_half_up() {
        // 333 * 7% = 23.31 -> 23.
        let breakdown = calculate(333, Some(7), TdsRounding::Nearest);
        assert_eq!(breakdown.withheld_minor, 23);
        assert_eq!(breakdown.payable_minor, 310);

        // 250 * 10% = 25 exactly either way.
        let breakdown = calculate(250, Some(10), TdsRounding::Nearest);
        assert_eq!(breakdown.withheld_minor, 25);
    }

    #[test]
    fn missing_or_zero_rate_withholds_nothing() {
        for rate in [None, Some(0), Some(-5)] {
            let breakdown = calculate(4217, rate, TdsRounding::RoundUp);
            assert_eq!(breakdown.withheld_minor, 0);
            assert_eq!(breakdown.payable_minor, 4217);
        }
    }

    #[test]
    fn rounding_policy_round_trips_through_storage() {
        assert_eq!(
            TdsRounding::try_from("round_up").unwrap(),
            TdsRounding::RoundUp
        );
        assert_eq!(
            TdsRounding::try_from("nearest").unwrap(),
            TdsRounding::Nearest
        );
        assert!(TdsRounding::try_from("banker").is_err());
    }
}
