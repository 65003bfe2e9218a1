//! Currency codes and rounding rules for monetary amounts.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! All amounts are `rust_decimal::Decimal` and are rounded with the helpers below.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};

/// Decimal places kept for monetary amounts.
pub const MONEY_DP: u32 = 2;

/// Decimal places kept for interest and discount rates.
pub const RATE_DP: u32 = 6;

/// Decimal places kept for percentages.
pub const PERCENT_DP: u32 = 2;

/// A monetary amount tagged with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount, rounded to cents on construction.
    #[serde(serialize_with = "cents::serialize")]
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: Currency,
}

impl Money {
    /// Creates a new amount, rounded to cents.
    #[must_use]
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: round_money(amount),
            currency,
        }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Adds two amounts of the same currency; `None` on a currency mismatch.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        (self.currency == other.currency)
            .then(|| Self::new(self.amount + other.amount, self.currency))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.2}", self.currency, self.amount)
    }
}

/// ISO 4217 currency codes supported by the system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar
    #[default]
    Usd,
    /// Panamanian Balboa
    Pab,
    /// Euro
    Eur,
    /// Mexican Peso
    Mxn,
    /// Colombian Peso
    Cop,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usd => write!(f, "USD"),
            Self::Pab => write!(f, "PAB"),
            Self::Eur => write!(f, "EUR"),
            Self::Mxn => write!(f, "MXN"),
            Self::Cop => write!(f, "COP"),
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "PAB" => Ok(Self::Pab),
            "EUR" => Ok(Self::Eur),
            "MXN" => Ok(Self::Mxn),
            "COP" => Ok(Self::Cop),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}

/// Rounds a monetary amount to cents, half away from zero.
///
/// The result always carries exactly two decimal places, so `1200` becomes
/// `1200.00`.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_DP);
    rounded
}

/// Rounds a rate (e.g. 0.123456) to six decimal places.
#[must_use]
pub fn round_rate(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a percentage to two decimal places.
#[must_use]
pub fn round_percent(percent: Decimal) -> Decimal {
    percent.round_dp_with_strategy(PERCENT_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Serializers that write amounts as strings with exactly two decimals.
///
/// Use with `#[serde(serialize_with = "cents::serialize")]` or one of the
/// container variants. Deserialization stays the plain `Decimal` one.
pub mod cents {
    use std::collections::BTreeMap;

    use super::{Decimal, Serialize, Serializer, round_money};

    struct Cents(Decimal);

    impl Serialize for Cents {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(&round_money(self.0))
        }
    }

    /// Single amount.
    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        Cents(*value).serialize(serializer)
    }

    /// Optional amount; `None` stays `null`.
    #[allow(clippy::ref_option)]
    pub fn option<S: Serializer>(
        value: &Option<Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(Cents).serialize(serializer)
    }

    /// Amounts per month.
    #[allow(clippy::ptr_arg)]
    pub fn vec<S: Serializer>(value: &Vec<Decimal>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(value.iter().map(|v| Cents(*v)))
    }

    /// Amounts by key.
    pub fn map<K: Serialize, S: Serializer>(
        value: &BTreeMap<K, Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(value.iter().map(|(k, v)| (k, Cents(*v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_currency_display() {
        assert_eq!(Currency::Usd.to_string(), "USD");
        assert_eq!(Currency::Pab.to_string(), "PAB");
        assert_eq!(Currency::Eur.to_string(), "EUR");
        assert_eq!(Currency::Mxn.to_string(), "MXN");
        assert_eq!(Currency::Cop.to_string(), "COP");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(Currency::from_str("USD").unwrap(), Currency::Usd);
        assert_eq!(Currency::from_str("pab").unwrap(), Currency::Pab);
        assert_eq!(Currency::from_str("Mxn").unwrap(), Currency::Mxn);
        assert!(Currency::from_str("XYZ").is_err());
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(-10.005)), dec!(-10.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
    }

    #[test]
    fn test_money_rounds_and_adds() {
        let a = Money::new(dec!(10.005), Currency::Usd);
        assert_eq!(a.amount, dec!(10.01));
        assert_eq!(a.to_string(), "USD 10.01");

        let sum = a.checked_add(Money::new(dec!(5), Currency::Usd)).unwrap();
        assert_eq!(sum.amount, dec!(15.01));
        assert!(a.checked_add(Money::zero(Currency::Eur)).is_none());
    }

    #[test]
    fn test_round_money_pads_to_cents() {
        assert_eq!(round_money(dec!(1200000)).to_string(), "1200000.00");
        assert_eq!(round_money(dec!(0)).to_string(), "0.00");
        assert_eq!(round_money(dec!(-3.5)).to_string(), "-3.50");
    }

    #[test]
    fn test_money_serializes_with_two_decimals() {
        let json = serde_json::to_value(Money::new(dec!(1200000), Currency::Usd)).unwrap();
        assert_eq!(json["amount"], "1200000.00");
        assert_eq!(json["currency"], "USD");
    }

    #[test]
    fn test_round_rate_and_percent() {
        assert_eq!(round_rate(dec!(0.1234565)), dec!(0.123457));
        assert_eq!(round_percent(dec!(12.345)), dec!(12.35));
    }
}
