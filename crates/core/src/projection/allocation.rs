//! Amount spreading using the Largest Remainder Method.
//!
//! Every function here returns parts whose sum is EXACTLY the total rounded
//! to cents. The method:
//! 1. Calculate exact shares
//! 2. Truncate each share to cents
//! 3. Hand the leftover cents, one each, to the shares with the largest
//!    truncated fractions

use cimiento_shared::types::{money::MONEY_DP, round_money};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// Smallest monetary unit (one cent).
fn unit() -> Decimal {
    Decimal::new(1, MONEY_DP)
}

/// Number of leftover cents in `remainder`, and the signed cent to hand out.
fn leftover_cents(remainder: Decimal) -> (usize, Decimal) {
    let cents = (remainder / unit()).trunc().abs().to_usize().unwrap_or(0);
    let step = if remainder.is_sign_negative() {
        -unit()
    } else {
        unit()
    };
    (cents, step)
}

/// Spreads `total` equally over `parts` months.
///
/// The earliest months receive the leftover cents.
///
/// ```
/// use rust_decimal_macros::dec;
/// use cimiento_core::projection::allocation::spread_equal;
///
/// let parts = spread_equal(dec!(100), 3);
/// assert_eq!(parts, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);
/// ```
#[must_use]
pub fn spread_equal(total: Decimal, parts: usize) -> Vec<Decimal> {
    if parts == 0 {
        return vec![];
    }

    let total = round_money(total);
    let count = Decimal::from(parts);
    let base = (total / count).round_dp_with_strategy(MONEY_DP, RoundingStrategy::ToZero);
    let (extra, step) = leftover_cents(total - base * count);

    (0..parts)
        .map(|i| if i < extra { base + step } else { base })
        .collect()
}

/// Spreads `total` proportionally to `weights`.
///
/// Negative weights count as zero. If every weight is zero the total is
/// spread equally instead.
#[must_use]
pub fn spread_by_weights(total: Decimal, weights: &[Decimal]) -> Vec<Decimal> {
    if weights.is_empty() {
        return vec![];
    }

    let weights: Vec<Decimal> = weights.iter().map(|w| (*w).max(Decimal::ZERO)).collect();
    let weight_sum: Decimal = weights.iter().copied().sum();
    if weight_sum.is_zero() {
        return spread_equal(total, weights.len());
    }

    let total = round_money(total);
    let exact: Vec<Decimal> = weights.iter().map(|w| total * *w / weight_sum).collect();
    let mut parts: Vec<Decimal> = exact
        .iter()
        .map(|e| e.round_dp_with_strategy(MONEY_DP, RoundingStrategy::ToZero))
        .collect();

    let allocated: Decimal = parts.iter().copied().sum();
    let (extra, step) = leftover_cents(total - allocated);

    // Largest truncated fraction first, earliest month on ties
    let mut order: Vec<usize> = (0..parts.len()).collect();
    order.sort_by(|&a, &b| {
        let frac_a = (exact[a] - parts[a]).abs();
        let frac_b = (exact[b] - parts[b]).abs();
        frac_b.cmp(&frac_a).then(a.cmp(&b))
    });

    for &i in order.iter().take(extra) {
        parts[i] += step;
    }

    parts
}

/// Triangular weights for an S-curve over `months` months.
///
/// Spending ramps up towards the middle of the span and tapers off again:
/// `weight[i] = min(i + 1, months - i)`.
#[must_use]
pub fn s_curve_weights(months: usize) -> Vec<Decimal> {
    (0..months)
        .map(|i| Decimal::from((i + 1).min(months - i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sum(parts: &[Decimal]) -> Decimal {
        parts.iter().copied().sum()
    }

    #[test]
    fn test_spread_equal_exact() {
        let parts = spread_equal(dec!(1200), 12);
        assert_eq!(parts.len(), 12);
        assert!(parts.iter().all(|p| *p == dec!(100)));
    }

    #[test]
    fn test_spread_equal_remainder_goes_first() {
        let parts = spread_equal(dec!(100), 3);
        assert_eq!(parts, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);
        assert_eq!(sum(&parts), dec!(100));
    }

    #[test]
    fn test_spread_equal_negative_total() {
        let parts = spread_equal(dec!(-100), 3);
        assert_eq!(parts, vec![dec!(-33.34), dec!(-33.33), dec!(-33.33)]);
    }

    #[test]
    fn test_spread_equal_rounds_input() {
        let parts = spread_equal(dec!(10.005), 2);
        assert_eq!(sum(&parts), dec!(10.01));
    }

    #[test]
    fn test_spread_equal_zero_parts() {
        assert!(spread_equal(dec!(100), 0).is_empty());
    }

    #[test]
    fn test_spread_by_weights_proportional() {
        let parts = spread_by_weights(dec!(1000), &[dec!(50), dec!(30), dec!(20)]);
        assert_eq!(parts, vec![dec!(500), dec!(300), dec!(200)]);
    }

    #[test]
    fn test_spread_by_weights_largest_remainder() {
        // 100 / 3 each: 33.333.. -> one extra cent
        let parts = spread_by_weights(dec!(100), &[dec!(1), dec!(1), dec!(1)]);
        assert_eq!(sum(&parts), dec!(100));
        assert_eq!(parts[0], dec!(33.34));
    }

    #[test]
    fn test_spread_by_weights_all_zero_falls_back() {
        let parts = spread_by_weights(dec!(90), &[dec!(0), dec!(0), dec!(0)]);
        assert_eq!(parts, vec![dec!(30), dec!(30), dec!(30)]);
    }

    #[test]
    fn test_spread_by_weights_ignores_negative() {
        let parts = spread_by_weights(dec!(100), &[dec!(-5), dec!(1)]);
        assert_eq!(parts, vec![dec!(0), dec!(100)]);
    }

    #[test]
    fn test_s_curve_weights() {
        assert_eq!(
            s_curve_weights(5),
            vec![dec!(1), dec!(2), dec!(3), dec!(2), dec!(1)]
        );
        assert_eq!(s_curve_weights(4), vec![dec!(1), dec!(2), dec!(2), dec!(1)]);
        assert_eq!(s_curve_weights(1), vec![dec!(1)]);
    }
}
