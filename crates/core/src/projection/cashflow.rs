//! Monthly cash-flow assembly.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use cimiento_shared::types::cents;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cost::{CostCategory, CostSchedule};
use super::credit::CreditSchedule;
use super::period::{ProjectMonth, month_label, month_start};
use super::sales::SalesSchedule;

/// A line of the cash-flow statement.
///
/// Serialized as a string key: `cost:<category>`, `sales_down_payment`,
/// `sales_delivery`, `credit_drawdown`, `credit_repayment`, `credit_interest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CashFlowLine {
    /// Development cost of a category.
    Cost(CostCategory),
    /// Down payment collections.
    SalesDownPayment,
    /// Balance collected at delivery.
    SalesDelivery,
    /// Credit drawdowns.
    CreditDrawdown,
    /// Credit principal repayments.
    CreditRepayment,
    /// Interest paid in cash.
    CreditInterest,
}

impl CashFlowLine {
    /// Whether the line brings cash in.
    #[must_use]
    pub const fn is_inflow(self) -> bool {
        matches!(
            self,
            Self::SalesDownPayment | Self::SalesDelivery | Self::CreditDrawdown
        )
    }

    /// Whether the line belongs to financing rather than the project itself.
    #[must_use]
    pub const fn is_financing(self) -> bool {
        matches!(
            self,
            Self::CreditDrawdown | Self::CreditRepayment | Self::CreditInterest
        )
    }

    /// Whether the line is sales revenue.
    #[must_use]
    pub const fn is_revenue(self) -> bool {
        matches!(self, Self::SalesDownPayment | Self::SalesDelivery)
    }
}

impl fmt::Display for CashFlowLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cost(category) => write!(f, "cost:{category}"),
            Self::SalesDownPayment => f.write_str("sales_down_payment"),
            Self::SalesDelivery => f.write_str("sales_delivery"),
            Self::CreditDrawdown => f.write_str("credit_drawdown"),
            Self::CreditRepayment => f.write_str("credit_repayment"),
            Self::CreditInterest => f.write_str("credit_interest"),
        }
    }
}

impl FromStr for CashFlowLine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(category) = s.strip_prefix("cost:") {
            return category.parse().map(Self::Cost);
        }
        match s {
            "sales_down_payment" => Ok(Self::SalesDownPayment),
            "sales_delivery" => Ok(Self::SalesDelivery),
            "credit_drawdown" => Ok(Self::CreditDrawdown),
            "credit_repayment" => Ok(Self::CreditRepayment),
            "credit_interest" => Ok(Self::CreditInterest),
            other => Err(format!("Unknown cash-flow line: {other}")),
        }
    }
}

impl TryFrom<String> for CashFlowLine {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CashFlowLine> for String {
    fn from(line: CashFlowLine) -> Self {
        line.to_string()
    }
}

/// Cash flow of one projection month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCashFlow {
    /// Month offset from the project start.
    pub month: ProjectMonth,
    /// Calendar label, `YYYY-MM`.
    pub label: String,
    /// First day of the month.
    pub period_start: NaiveDate,
    /// Sales collections plus credit drawdowns.
    #[serde(serialize_with = "cents::serialize")]
    pub inflows: Decimal,
    /// Costs plus credit repayments and paid interest.
    #[serde(serialize_with = "cents::serialize")]
    pub outflows: Decimal,
    /// Sales collections minus costs.
    #[serde(serialize_with = "cents::serialize")]
    pub project_net: Decimal,
    /// Drawdowns minus repayments and paid interest.
    #[serde(serialize_with = "cents::serialize")]
    pub financing_net: Decimal,
    /// `inflows - outflows`.
    #[serde(serialize_with = "cents::serialize")]
    pub net: Decimal,
    /// Running sum of `net`.
    #[serde(serialize_with = "cents::serialize")]
    pub cumulative: Decimal,
    /// Running sum of `project_net`.
    #[serde(serialize_with = "cents::serialize")]
    pub project_cumulative: Decimal,
    /// Non-zero amounts by line key.
    #[serde(serialize_with = "cents::map")]
    pub breakdown: BTreeMap<String, Decimal>,
}

#[derive(Default)]
struct MonthTotals {
    lines: BTreeMap<CashFlowLine, Decimal>,
}

impl MonthTotals {
    fn add(&mut self, line: CashFlowLine, amount: Decimal) {
        if !amount.is_zero() {
            *self.lines.entry(line).or_insert(Decimal::ZERO) += amount;
        }
    }

    fn sum_where(&self, pred: impl Fn(CashFlowLine) -> bool) -> Decimal {
        self.lines
            .iter()
            .filter(|(line, _)| pred(**line))
            .map(|(_, amount)| *amount)
            .sum()
    }
}

/// Assembles monthly cash flows from the phased costs, sales collections and
/// credit schedules.
#[must_use]
pub fn assemble(
    start_date: NaiveDate,
    horizon: u32,
    costs: &CostSchedule,
    sales: &SalesSchedule,
    credit: &[CreditSchedule],
) -> Vec<MonthlyCashFlow> {
    let mut totals: Vec<MonthTotals> = (0..horizon).map(|_| MonthTotals::default()).collect();

    for (category, monthly) in &costs.by_category {
        for (m, amount) in monthly.iter().enumerate().take(horizon as usize) {
            totals[m].add(CashFlowLine::Cost(*category), *amount);
        }
    }

    for (m, amount) in sales.down_payment.iter().enumerate().take(horizon as usize) {
        totals[m].add(CashFlowLine::SalesDownPayment, *amount);
    }
    for (m, amount) in sales.delivery.iter().enumerate().take(horizon as usize) {
        totals[m].add(CashFlowLine::SalesDelivery, *amount);
    }

    for schedule in credit {
        for cm in schedule.months.iter().take(horizon as usize) {
            let slot = &mut totals[cm.month as usize];
            slot.add(CashFlowLine::CreditDrawdown, cm.drawdown);
            slot.add(CashFlowLine::CreditRepayment, cm.repayment);
            slot.add(CashFlowLine::CreditInterest, cm.interest_paid);
        }
    }

    let mut cumulative = Decimal::ZERO;
    let mut project_cumulative = Decimal::ZERO;

    totals
        .into_iter()
        .zip(0..horizon)
        .map(|(month_totals, month)| {
            let inflows = month_totals.sum_where(CashFlowLine::is_inflow);
            let outflows = month_totals.sum_where(|l| !l.is_inflow());
            let revenue = month_totals.sum_where(CashFlowLine::is_revenue);
            let cost = month_totals.sum_where(|l| matches!(l, CashFlowLine::Cost(_)));
            let project_net = revenue - cost;
            let financing_net = month_totals.sum_where(|l| l.is_financing() && l.is_inflow())
                - month_totals.sum_where(|l| l.is_financing() && !l.is_inflow());
            let net = inflows - outflows;

            cumulative += net;
            project_cumulative += project_net;

            MonthlyCashFlow {
                month,
                label: month_label(start_date, month),
                period_start: month_start(start_date, month),
                inflows,
                outflows,
                project_net,
                financing_net,
                net,
                cumulative,
                project_cumulative,
                breakdown: month_totals
                    .lines
                    .into_iter()
                    .map(|(line, amount)| (line.to_string(), amount))
                    .collect(),
            }
        })
        .collect()
}

/// Unleveraged monthly flows.
#[must_use]
pub fn project_flows(monthly: &[MonthlyCashFlow]) -> Vec<Decimal> {
    monthly.iter().map(|m| m.project_net).collect()
}

/// Leveraged monthly flows, financing included.
#[must_use]
pub fn equity_flows(monthly: &[MonthlyCashFlow]) -> Vec<Decimal> {
    monthly.iter().map(|m| m.net).collect()
}

/// Monthly sales collections.
#[must_use]
pub fn revenue_flows(monthly: &[MonthlyCashFlow]) -> Vec<Decimal> {
    monthly
        .iter()
        .map(|m| {
            m.breakdown
                .iter()
                .filter(|(key, _)| {
                    key.parse::<CashFlowLine>()
                        .is_ok_and(CashFlowLine::is_revenue)
                })
                .map(|(_, amount)| *amount)
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::credit::{CreditMonth, InterestMode};
    use cimiento_shared::types::CreditLineId;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn costs() -> CostSchedule {
        let mut by_category = BTreeMap::new();
        by_category.insert(CostCategory::Land, vec![dec!(1000), dec!(0), dec!(0)]);
        by_category.insert(CostCategory::Construction, vec![dec!(0), dec!(300), dec!(300)]);
        CostSchedule {
            by_category,
            monthly_total: vec![dec!(1000), dec!(300), dec!(300)],
            category_totals: BTreeMap::new(),
            total: dec!(1600),
        }
    }

    fn sales() -> SalesSchedule {
        SalesSchedule {
            down_payment: vec![dec!(0), dec!(200), dec!(0)],
            delivery: vec![dec!(0), dec!(0), dec!(1800)],
            units: vec![],
            total_revenue: dec!(2000),
            total_area: dec!(100),
        }
    }

    fn credit() -> CreditSchedule {
        let month = |m: u32, drawdown, interest_paid, repayment| CreditMonth {
            month: m,
            drawdown,
            interest_paid,
            interest: interest_paid,
            repayment,
            ..CreditMonth::default()
        };
        CreditSchedule {
            line_id: CreditLineId::new(),
            name: "Bank".to_string(),
            interest_mode: InterestMode::Paid,
            months: vec![
                month(0, dec!(800), dec!(0), dec!(0)),
                month(1, dec!(0), dec!(8), dec!(0)),
                month(2, dec!(0), dec!(8), dec!(800)),
            ],
            total_drawn: dec!(800),
            total_interest: dec!(16),
            total_interest_paid: dec!(16),
            total_repaid: dec!(800),
            peak_balance: dec!(800),
            warnings: vec![],
        }
    }

    #[test]
    fn test_assemble_totals() {
        let flows = assemble(start(), 3, &costs(), &sales(), &[credit()]);

        assert_eq!(flows.len(), 3);
        assert_eq!(flows[0].label, "2026-01");
        assert_eq!(flows[0].period_start, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        assert_eq!(flows[0].inflows, dec!(800));
        assert_eq!(flows[0].outflows, dec!(1000));
        assert_eq!(flows[0].project_net, dec!(-1000));
        assert_eq!(flows[0].financing_net, dec!(800));
        assert_eq!(flows[0].net, dec!(-200));

        assert_eq!(flows[2].inflows, dec!(1800));
        assert_eq!(flows[2].outflows, dec!(1108));
        assert_eq!(flows[2].project_net, dec!(1500));
        assert_eq!(flows[2].financing_net, dec!(-808));
    }

    #[test]
    fn test_net_identity_and_cumulative() {
        let flows = assemble(start(), 3, &costs(), &sales(), &[credit()]);

        let mut running = Decimal::ZERO;
        for f in &flows {
            assert_eq!(f.net, f.inflows - f.outflows);
            assert_eq!(f.net, f.project_net + f.financing_net);
            running += f.net;
            assert_eq!(f.cumulative, running);
        }
        assert_eq!(flows[2].project_cumulative, dec!(400));
    }

    #[test]
    fn test_breakdown_only_non_zero() {
        let flows = assemble(start(), 3, &costs(), &sales(), &[credit()]);

        assert_eq!(flows[0].breakdown.len(), 2);
        assert_eq!(flows[0].breakdown["cost:land"], dec!(1000));
        assert_eq!(flows[0].breakdown["credit_drawdown"], dec!(800));
        assert!(!flows[0].breakdown.contains_key("cost:construction"));
    }

    #[test]
    fn test_flow_series_helpers() {
        let flows = assemble(start(), 3, &costs(), &sales(), &[]);
        assert_eq!(project_flows(&flows), vec![dec!(-1000), dec!(-100), dec!(1500)]);
        assert_eq!(equity_flows(&flows), project_flows(&flows));
        assert_eq!(revenue_flows(&flows), vec![dec!(0), dec!(200), dec!(1800)]);
    }

    #[rstest]
    #[case("cost:soft_costs", CashFlowLine::Cost(CostCategory::SoftCosts))]
    #[case("sales_down_payment", CashFlowLine::SalesDownPayment)]
    #[case("sales_delivery", CashFlowLine::SalesDelivery)]
    #[case("credit_drawdown", CashFlowLine::CreditDrawdown)]
    #[case("credit_repayment", CashFlowLine::CreditRepayment)]
    #[case("credit_interest", CashFlowLine::CreditInterest)]
    fn test_line_keys(#[case] key: &str, #[case] line: CashFlowLine) {
        assert_eq!(key.parse::<CashFlowLine>().unwrap(), line);
        assert_eq!(line.to_string(), key);
    }

    #[test]
    fn test_line_key_rejects_unknown() {
        assert!("cost:yachts".parse::<CashFlowLine>().is_err());
        assert!("payroll".parse::<CashFlowLine>().is_err());
    }

    #[test]
    fn test_line_serde_as_string() {
        let json = serde_json::to_string(&CashFlowLine::Cost(CostCategory::Land)).unwrap();
        assert_eq!(json, "\"cost:land\"");
        let back: CashFlowLine = serde_json::from_str("\"credit_interest\"").unwrap();
        assert_eq!(back, CashFlowLine::CreditInterest);
    }
}
