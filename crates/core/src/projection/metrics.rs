//! Financial metrics over monthly cash flows: NPV, IRR, payback, break-even.
//!
//! All rates passed in or returned are annual unless the name says
//! otherwise. Monthly flows are discounted with the nominal monthly rate
//! `annual / 12`; month 0 is not discounted.

use cimiento_shared::types::{cents, round_money, round_percent, round_rate};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

use super::period::ProjectMonth;
use super::sales::UnitSchedule;

/// Months per year, for converting annual rates.
const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Convergence tolerance on NPV for the IRR solvers (1e-7).
const IRR_NPV_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 7);

/// Convergence tolerance on the rate step for the IRR solvers (1e-14).
const IRR_STEP_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 14);

/// Initial monthly rate guess for Newton-Raphson (1%).
const IRR_INITIAL_GUESS: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Lowest monthly rate tried (-99%).
const IRR_MIN_RATE: Decimal = Decimal::from_parts(99, 0, 0, true, 2);

/// Highest monthly rate tried by Newton-Raphson (1000%).
const IRR_MAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

const NEWTON_MAX_ITERATIONS: u32 = 100;
const BISECTION_MAX_ITERATIONS: u32 = 200;

/// Returns `(1 + rate)^periods`.
#[must_use]
pub fn compound_factor(rate: Decimal, periods: u32) -> Decimal {
    (Decimal::ONE + rate)
        .checked_powu(u64::from(periods))
        .unwrap_or(Decimal::MAX)
}

/// Converts an annual nominal rate to a monthly rate.
#[must_use]
pub fn monthly_rate(annual_rate: Decimal) -> Decimal {
    annual_rate / MONTHS_PER_YEAR
}

/// Net present value of monthly flows at an annual discount rate.
#[must_use]
pub fn npv(flows: &[Decimal], annual_rate: Decimal) -> Decimal {
    let factor = Decimal::ONE + monthly_rate(annual_rate);
    let mut discount = Decimal::ONE;
    let mut total = Decimal::ZERO;

    for cf in flows {
        if let Some(term) = cf.checked_div(discount) {
            total += term;
        }
        match discount.checked_mul(factor) {
            Some(next) => discount = next,
            None => break,
        }
    }

    round_money(total)
}

/// NPV and its derivative with respect to the monthly rate.
///
/// Returns `None` when the rate is out of domain or the sums overflow.
fn npv_and_derivative(flows: &[Decimal], rate: Decimal) -> Option<(Decimal, Decimal)> {
    let factor = Decimal::ONE.checked_add(rate)?;
    if factor <= Decimal::ZERO {
        return None;
    }

    let mut discount = Decimal::ONE;
    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;

    for (t, cf) in flows.iter().enumerate() {
        let term = cf.checked_div(discount)?;
        value = value.checked_add(term)?;
        if t > 0 {
            // d/dr of cf * (1+r)^-t is -t * cf * (1+r)^-(t+1)
            let d = Decimal::from(t).checked_mul(term)?.checked_div(factor)?;
            slope = slope.checked_sub(d)?;
        }
        // Past this point the remaining terms are negligible
        match discount.checked_mul(factor) {
            Some(next) => discount = next,
            None => break,
        }
    }

    Some((value, slope))
}

fn npv_at(flows: &[Decimal], rate: Decimal) -> Option<Decimal> {
    npv_and_derivative(flows, rate).map(|(value, _)| value)
}

fn has_sign_change(flows: &[Decimal]) -> bool {
    let positive = flows.iter().any(|cf| *cf > Decimal::ZERO);
    let negative = flows.iter().any(|cf| *cf < Decimal::ZERO);
    positive && negative
}

fn opposite_signs(a: Decimal, b: Decimal) -> bool {
    (a < Decimal::ZERO && b > Decimal::ZERO) || (a > Decimal::ZERO && b < Decimal::ZERO)
}

fn newton_raphson(flows: &[Decimal]) -> Option<Decimal> {
    let mut rate = IRR_INITIAL_GUESS;

    for _ in 0..NEWTON_MAX_ITERATIONS {
        let (value, slope) = npv_and_derivative(flows, rate)?;
        if value.abs() < IRR_NPV_TOLERANCE {
            return Some(rate);
        }
        if slope.is_zero() {
            return None;
        }

        let next = (rate - value.checked_div(slope)?).clamp(IRR_MIN_RATE, IRR_MAX_RATE);
        if (next - rate).abs() < IRR_STEP_TOLERANCE {
            return Some(next);
        }
        rate = next;
    }

    None
}

fn bisection(flows: &[Decimal]) -> Option<Decimal> {
    let mut low = IRR_MIN_RATE;
    let mut high = Decimal::ONE;

    // Very negative rates overflow on long horizons; move towards zero until evaluable
    let mut f_low = None;
    for _ in 0..20 {
        f_low = npv_at(flows, low);
        if f_low.is_some() {
            break;
        }
        low /= Decimal::TWO;
    }
    let mut f_low = f_low?;
    let f_high = npv_at(flows, high)?;

    if f_low.is_zero() {
        return Some(low);
    }
    if f_high.is_zero() {
        return Some(high);
    }
    if !opposite_signs(f_low, f_high) {
        return None;
    }

    for _ in 0..BISECTION_MAX_ITERATIONS {
        let mid = (low + high) / Decimal::TWO;
        let f_mid = npv_at(flows, mid)?;
        if f_mid.abs() < IRR_NPV_TOLERANCE || (high - low) < IRR_STEP_TOLERANCE {
            return Some(mid);
        }
        if opposite_signs(f_low, f_mid) {
            high = mid;
        } else {
            low = mid;
            f_low = f_mid;
        }
    }

    Some((low + high) / Decimal::TWO)
}

/// Monthly internal rate of return.
///
/// Newton-Raphson first, bisection as a fallback. `None` when the flows
/// never change sign or no root is found.
#[must_use]
pub fn monthly_irr(flows: &[Decimal]) -> Option<Decimal> {
    if !has_sign_change(flows) {
        return None;
    }
    newton_raphson(flows).or_else(|| bisection(flows))
}

/// Annualized internal rate of return, `(1 + monthly)^12 - 1`.
#[must_use]
pub fn irr(flows: &[Decimal]) -> Option<Decimal> {
    monthly_irr(flows).map(|m| round_rate(compound_factor(m, 12) - Decimal::ONE))
}

/// Months until the cumulative flow first recovers from negative territory.
///
/// The crossing month is interpolated linearly. `Some(0)` if the cumulative
/// flow never goes negative, `None` if it never recovers.
#[must_use]
pub fn payback_period(flows: &[Decimal]) -> Option<Decimal> {
    let mut cumulative = Decimal::ZERO;
    let mut was_negative = false;

    for (t, cf) in flows.iter().enumerate() {
        let previous = cumulative;
        cumulative += *cf;

        if cumulative < Decimal::ZERO {
            was_negative = true;
            continue;
        }

        if was_negative && previous < Decimal::ZERO {
            let fraction = if cf.is_zero() {
                Decimal::ONE
            } else {
                -previous / *cf
            };
            let months = Decimal::from(t) - Decimal::ONE + fraction;
            return Some(months.max(Decimal::ZERO).round_dp(2));
        }
    }

    if was_negative { None } else { Some(Decimal::ZERO) }
}

/// Largest funding gap: the most negative cumulative flow, as a positive amount.
#[must_use]
pub fn peak_funding(flows: &[Decimal]) -> Decimal {
    let mut cumulative = Decimal::ZERO;
    let mut lowest = Decimal::ZERO;
    for cf in flows {
        cumulative += *cf;
        lowest = lowest.min(cumulative);
    }
    -lowest
}

/// Metrics for one perspective (project or equity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    /// Net present value at the scenario discount rate.
    #[serde(serialize_with = "cents::serialize")]
    pub npv: Decimal,
    /// Annualized IRR; `None` when undefined.
    pub irr: Option<Decimal>,
    /// Monthly IRR; `None` when undefined.
    pub monthly_irr: Option<Decimal>,
    /// Payback period in months.
    pub payback_months: Option<Decimal>,
    /// Total sales revenue.
    #[serde(serialize_with = "cents::serialize")]
    pub total_revenue: Decimal,
    /// Total development cost.
    #[serde(serialize_with = "cents::serialize")]
    pub total_cost: Decimal,
    /// Interest cost carried by this perspective.
    #[serde(serialize_with = "cents::serialize")]
    pub financing_cost: Decimal,
    /// Revenue minus development and financing cost.
    #[serde(serialize_with = "cents::serialize")]
    pub gross_profit: Decimal,
    /// Profit over revenue, in percent.
    pub margin_pct: Decimal,
    /// Profit over total cost, in percent.
    pub roi_pct: Decimal,
    /// Largest cumulative funding gap.
    #[serde(serialize_with = "cents::serialize")]
    pub peak_funding: Decimal,
}

impl FinancialMetrics {
    /// Computes metrics for a flow series.
    #[must_use]
    pub fn compute(
        flows: &[Decimal],
        total_revenue: Decimal,
        total_cost: Decimal,
        financing_cost: Decimal,
        annual_discount_rate: Decimal,
    ) -> Self {
        let profit = total_revenue - total_cost - financing_cost;
        let all_in_cost = total_cost + financing_cost;

        let margin_pct = if total_revenue.is_zero() {
            Decimal::ZERO
        } else {
            round_percent(profit / total_revenue * Decimal::ONE_HUNDRED)
        };
        let roi_pct = if all_in_cost.is_zero() {
            Decimal::ZERO
        } else {
            round_percent(profit / all_in_cost * Decimal::ONE_HUNDRED)
        };

        let monthly = monthly_irr(flows);

        Self {
            npv: npv(flows, annual_discount_rate),
            irr: monthly.map(|m| round_rate(compound_factor(m, 12) - Decimal::ONE)),
            monthly_irr: monthly.map(round_rate),
            payback_months: payback_period(flows),
            total_revenue,
            total_cost,
            financing_cost,
            gross_profit: profit,
            margin_pct,
            roi_pct,
            peak_funding: peak_funding(flows),
        }
    }
}

/// Break-even figures for a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakEven {
    /// Revenue needed to cover development and financing cost.
    #[serde(serialize_with = "cents::serialize")]
    pub required_revenue: Decimal,
    /// Fewest units, in sales order, whose revenue covers the requirement.
    pub units_required: Option<u32>,
    /// Units in the scenario.
    pub units_total: u32,
    /// Required revenue per sellable square meter.
    #[serde(serialize_with = "cents::option")]
    pub price_per_m2: Option<Decimal>,
    /// First month in which cumulative revenue covers the requirement.
    pub month: Option<ProjectMonth>,
    /// Projected revenue over required revenue, in percent.
    pub coverage_pct: Decimal,
}

/// Computes break-even figures.
#[must_use]
pub fn break_even(
    units: &[UnitSchedule],
    monthly_revenue: &[Decimal],
    total_cost: Decimal,
    financing_cost: Decimal,
    total_area: Decimal,
) -> BreakEven {
    let required_revenue = total_cost + financing_cost;

    let mut ordered: Vec<&UnitSchedule> = units.iter().collect();
    ordered.sort_by_key(|u| u.sale_month);

    let units_required = if required_revenue <= Decimal::ZERO {
        Some(0)
    } else {
        let mut covered = Decimal::ZERO;
        ordered.iter().enumerate().find_map(|(i, unit)| {
            covered += unit.net_price;
            (covered >= required_revenue).then(|| u32::try_from(i + 1).unwrap_or(u32::MAX))
        })
    };

    let price_per_m2 =
        (total_area > Decimal::ZERO).then(|| round_money(required_revenue / total_area));

    let month = if required_revenue <= Decimal::ZERO {
        Some(0)
    } else {
        let mut cumulative = Decimal::ZERO;
        monthly_revenue.iter().enumerate().find_map(|(m, revenue)| {
            cumulative += *revenue;
            (cumulative >= required_revenue)
                .then(|| ProjectMonth::try_from(m).unwrap_or(ProjectMonth::MAX))
        })
    };

    let total_revenue: Decimal = units.iter().map(|u| u.net_price).sum();
    let coverage_pct = if required_revenue.is_zero() {
        Decimal::ZERO
    } else {
        round_percent(total_revenue / required_revenue * Decimal::ONE_HUNDRED)
    };

    BreakEven {
        required_revenue,
        units_required,
        units_total: u32::try_from(units.len()).unwrap_or(u32::MAX),
        price_per_m2,
        month,
        coverage_pct,
    }
}

/// Metrics for both perspectives plus break-even.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionMetrics {
    /// Annual discount rate used for NPV.
    pub discount_rate: Decimal,
    /// Unleveraged: revenue minus development costs.
    pub project: FinancialMetrics,
    /// Leveraged: includes credit drawdowns, repayments, and interest.
    pub equity: FinancialMetrics,
    /// Break-even figures.
    pub break_even: BreakEven,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimiento_shared::types::SalesUnitId;
    use rust_decimal_macros::dec;

    use crate::projection::sales::UnitStatus;

    fn unit(sale_month: u32, price: Decimal) -> UnitSchedule {
        UnitSchedule {
            unit_id: SalesUnitId::new(),
            code: format!("U{sale_month}"),
            status: UnitStatus::Available,
            area_m2: dec!(100),
            sale_month,
            delivery_month: sale_month,
            paced: true,
            net_price: price,
            down_payment: Decimal::ZERO,
            installments: 1,
            delivery_balance: price,
        }
    }

    #[test]
    fn test_compound_factor() {
        assert_eq!(compound_factor(dec!(0.1), 0), dec!(1));
        assert_eq!(compound_factor(dec!(0.1), 2), dec!(1.21));
        assert_eq!(round_rate(compound_factor(dec!(0.01), 12)), dec!(1.126825));
        assert_eq!(compound_factor(dec!(10), 200), Decimal::MAX);
    }

    #[test]
    fn test_npv_zero_rate_is_sum() {
        let flows = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        assert_eq!(npv(&flows, Decimal::ZERO), dec!(200));
    }

    #[test]
    fn test_npv_discounts_monthly() {
        // 12% annual -> 1% monthly
        let flows = vec![dec!(-100), dec!(101)];
        assert_eq!(npv(&flows, dec!(0.12)), dec!(0));
    }

    #[test]
    fn test_monthly_irr_simple() {
        let flows = vec![dec!(-100), dec!(110)];
        let monthly = monthly_irr(&flows).unwrap();
        assert!((monthly - dec!(0.1)).abs() < dec!(0.0000001));
        assert_eq!(irr(&flows), Some(dec!(2.138428)));
    }

    #[test]
    fn test_irr_one_year_investment() {
        let mut flows = vec![dec!(-1000)];
        flows.extend(vec![Decimal::ZERO; 11]);
        flows.push(dec!(1100));

        let annual = irr(&flows).unwrap();
        assert!((annual - dec!(0.10)).abs() < dec!(0.0001), "got {annual}");
    }

    #[test]
    fn test_irr_requires_sign_change() {
        assert_eq!(irr(&[dec!(100), dec!(200)]), None);
        assert_eq!(irr(&[dec!(-100), dec!(-200)]), None);
        assert_eq!(irr(&[]), None);
    }

    #[test]
    fn test_irr_negative_return() {
        let flows = vec![dec!(-1000), dec!(500), dec!(400)];
        let monthly = monthly_irr(&flows).unwrap();
        assert!(monthly < Decimal::ZERO);
        let check = npv_at(&flows, monthly).unwrap();
        assert!(check.abs() < dec!(0.00001));
    }

    #[test]
    fn test_payback_exact_month() {
        let flows = vec![dec!(-100), dec!(50), dec!(50)];
        assert_eq!(payback_period(&flows), Some(dec!(2)));
    }

    #[test]
    fn test_payback_interpolated() {
        let flows = vec![dec!(-100), dec!(30), dec!(30), dec!(80)];
        assert_eq!(payback_period(&flows), Some(dec!(2.5)));
    }

    #[test]
    fn test_payback_never_negative() {
        assert_eq!(payback_period(&[dec!(10), dec!(20)]), Some(Decimal::ZERO));
    }

    #[test]
    fn test_payback_never_recovers() {
        assert_eq!(payback_period(&[dec!(-100), dec!(20)]), None);
    }

    #[test]
    fn test_peak_funding() {
        let flows = vec![dec!(50), dec!(-200), dec!(-100), dec!(400)];
        assert_eq!(peak_funding(&flows), dec!(250));
        assert_eq!(peak_funding(&[dec!(10)]), Decimal::ZERO);
    }

    #[test]
    fn test_financial_metrics_margins() {
        let flows = vec![dec!(-800), dec!(1000)];
        let metrics = FinancialMetrics::compute(&flows, dec!(1000), dec!(750), dec!(50), dec!(0));

        assert_eq!(metrics.gross_profit, dec!(200));
        assert_eq!(metrics.margin_pct, dec!(20.00));
        assert_eq!(metrics.roi_pct, dec!(25.00));
        assert_eq!(metrics.npv, dec!(200));
        assert_eq!(metrics.peak_funding, dec!(800));
        assert_eq!(metrics.payback_months, Some(dec!(0.8)));
        assert!(metrics.irr.is_some());
    }

    #[test]
    fn test_break_even() {
        let units = vec![unit(3, dec!(400)), unit(1, dec!(300)), unit(2, dec!(500))];
        let monthly = vec![dec!(0), dec!(300), dec!(500), dec!(400)];

        let result = break_even(&units, &monthly, dec!(700), dec!(50), dec!(300));

        assert_eq!(result.required_revenue, dec!(750));
        // Sales order: 300 (m1), 500 (m2) -> covered after two units
        assert_eq!(result.units_required, Some(2));
        assert_eq!(result.units_total, 3);
        assert_eq!(result.price_per_m2, Some(dec!(2.50)));
        assert_eq!(result.month, Some(2));
        assert_eq!(result.coverage_pct, dec!(160.00));
    }

    #[test]
    fn test_break_even_not_reached() {
        let units = vec![unit(1, dec!(100))];
        let result = break_even(&units, &[dec!(0), dec!(100)], dec!(1000), dec!(0), dec!(0));
        assert_eq!(result.units_required, None);
        assert_eq!(result.month, None);
        assert_eq!(result.price_per_m2, None);
    }

    #[test]
    fn test_break_even_without_costs() {
        let units = vec![unit(2, dec!(100))];
        let monthly = vec![dec!(0), dec!(0), dec!(100)];
        let result = break_even(&units, &monthly, dec!(0), dec!(0), dec!(50));
        assert_eq!(result.required_revenue, Decimal::ZERO);
        assert_eq!(result.units_required, Some(0));
        assert_eq!(result.month, Some(0));
        assert_eq!(result.coverage_pct, Decimal::ZERO);
    }
}
