//! Baseline vs actual comparison.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use cimiento_shared::types::{cents, round_percent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cashflow::{CashFlowLine, MonthlyCashFlow};
use super::period::{ProjectMonth, month_label};

/// A recorded actual amount for one cash-flow line and month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualEntry {
    /// Month offset from the project start.
    pub month: ProjectMonth,
    /// Cash-flow line the amount belongs to.
    pub line: CashFlowLine,
    /// Amount, positive in the line's natural direction.
    #[serde(serialize_with = "cents::serialize")]
    pub amount: Decimal,
}

/// Direction of a variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceStatus {
    /// More cash in, or less cash out, than the baseline.
    Favorable,
    /// Less cash in, or more cash out, than the baseline.
    Unfavorable,
    /// No variance.
    OnTrack,
}

impl VarianceStatus {
    fn from_variance(variance: Decimal) -> Self {
        match variance.cmp(&Decimal::ZERO) {
            std::cmp::Ordering::Greater => Self::Favorable,
            std::cmp::Ordering::Less => Self::Unfavorable,
            std::cmp::Ordering::Equal => Self::OnTrack,
        }
    }
}

/// Where the baseline came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineSource {
    /// Snapshot taken when the scenario was approved.
    Approved,
    /// The scenario's current projection.
    CurrentProjection,
}

/// Variance of one cash-flow line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineVariance {
    /// Cash-flow line.
    pub line: CashFlowLine,
    /// Baseline amount.
    #[serde(serialize_with = "cents::serialize")]
    pub baseline: Decimal,
    /// Actual amount.
    #[serde(serialize_with = "cents::serialize")]
    pub actual: Decimal,
    /// Signed variance, positive when favorable.
    #[serde(serialize_with = "cents::serialize")]
    pub variance: Decimal,
    /// Variance over baseline, in percent.
    pub variance_pct: Decimal,
    /// Actual over baseline, in percent.
    pub utilization_pct: Decimal,
    /// Direction of the variance.
    pub status: VarianceStatus,
}

/// Computes the variance of one line.
///
/// Inflow lines use `actual - baseline`, outflow lines `baseline - actual`.
#[must_use]
pub fn line_variance(line: CashFlowLine, baseline: Decimal, actual: Decimal) -> LineVariance {
    let variance = if line.is_inflow() {
        actual - baseline
    } else {
        baseline - actual
    };

    let (variance_pct, utilization_pct) = if baseline.is_zero() {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        (
            round_percent(variance / baseline * Decimal::ONE_HUNDRED),
            round_percent(actual / baseline * Decimal::ONE_HUNDRED),
        )
    };

    LineVariance {
        line,
        baseline,
        actual,
        variance,
        variance_pct,
        utilization_pct,
        status: VarianceStatus::from_variance(variance),
    }
}

/// One month of the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Month offset from the project start.
    pub month: ProjectMonth,
    /// Calendar label.
    pub label: String,
    /// Baseline inflows.
    #[serde(serialize_with = "cents::serialize")]
    pub baseline_inflows: Decimal,
    /// Actual inflows.
    #[serde(serialize_with = "cents::serialize")]
    pub actual_inflows: Decimal,
    /// Baseline outflows.
    #[serde(serialize_with = "cents::serialize")]
    pub baseline_outflows: Decimal,
    /// Actual outflows.
    #[serde(serialize_with = "cents::serialize")]
    pub actual_outflows: Decimal,
    /// Baseline net flow.
    #[serde(serialize_with = "cents::serialize")]
    pub baseline_net: Decimal,
    /// Actual net flow.
    #[serde(serialize_with = "cents::serialize")]
    pub actual_net: Decimal,
    /// `actual_net - baseline_net`; zero for months without actuals.
    #[serde(serialize_with = "cents::serialize")]
    pub net_variance: Decimal,
    /// Running sum of `net_variance`.
    #[serde(serialize_with = "cents::serialize")]
    pub cumulative_variance: Decimal,
    /// Direction of `net_variance`.
    pub status: VarianceStatus,
    /// Whether any actual was recorded for the month.
    pub has_actuals: bool,
    /// Per-line variances, only for months with actuals.
    pub lines: Vec<LineVariance>,
}

/// Totals over the months that have actuals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonTotals {
    /// Months with at least one actual.
    pub months_reported: u32,
    /// Baseline inflows over reported months.
    #[serde(serialize_with = "cents::serialize")]
    pub baseline_inflows: Decimal,
    /// Actual inflows over reported months.
    #[serde(serialize_with = "cents::serialize")]
    pub actual_inflows: Decimal,
    /// Baseline outflows over reported months.
    #[serde(serialize_with = "cents::serialize")]
    pub baseline_outflows: Decimal,
    /// Actual outflows over reported months.
    #[serde(serialize_with = "cents::serialize")]
    pub actual_outflows: Decimal,
    /// Net variance over reported months.
    #[serde(serialize_with = "cents::serialize")]
    pub net_variance: Decimal,
    /// Direction of `net_variance`.
    pub status: VarianceStatus,
}

/// Full baseline vs actual report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Where the baseline came from.
    pub source: BaselineSource,
    /// One row per month of baseline or actuals.
    pub rows: Vec<ComparisonRow>,
    /// Per-line variances summed over reported months.
    pub by_line: Vec<LineVariance>,
    /// Report totals.
    pub totals: ComparisonTotals,
}

fn split(lines: &BTreeMap<CashFlowLine, Decimal>) -> (Decimal, Decimal) {
    lines
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(inflows, outflows), (line, amount)| {
            if line.is_inflow() {
                (inflows + amount, outflows)
            } else {
                (inflows, outflows + amount)
            }
        })
}

fn baseline_lines(flow: &MonthlyCashFlow) -> BTreeMap<CashFlowLine, Decimal> {
    flow.breakdown
        .iter()
        .filter_map(|(key, amount)| key.parse().ok().map(|line| (line, *amount)))
        .collect()
}

/// Compares a baseline with recorded actuals, month by month.
///
/// Months with actuals past the end of the baseline are included with a
/// zero baseline.
#[must_use]
pub fn compare(
    start_date: NaiveDate,
    baseline: &[MonthlyCashFlow],
    actuals: &[ActualEntry],
    source: BaselineSource,
) -> ComparisonReport {
    let mut actual_by_month: BTreeMap<ProjectMonth, BTreeMap<CashFlowLine, Decimal>> =
        BTreeMap::new();
    for entry in actuals {
        *actual_by_month
            .entry(entry.month)
            .or_default()
            .entry(entry.line)
            .or_insert(Decimal::ZERO) += entry.amount;
    }

    let baseline_by_month: BTreeMap<ProjectMonth, &MonthlyCashFlow> =
        baseline.iter().map(|f| (f.month, f)).collect();
    let months: BTreeSet<ProjectMonth> = baseline_by_month
        .keys()
        .chain(actual_by_month.keys())
        .copied()
        .collect();

    let mut rows = Vec::with_capacity(months.len());
    let mut line_totals: BTreeMap<CashFlowLine, (Decimal, Decimal)> = BTreeMap::new();
    let mut cumulative_variance = Decimal::ZERO;
    let mut totals = ComparisonTotals {
        months_reported: 0,
        baseline_inflows: Decimal::ZERO,
        actual_inflows: Decimal::ZERO,
        baseline_outflows: Decimal::ZERO,
        actual_outflows: Decimal::ZERO,
        net_variance: Decimal::ZERO,
        status: VarianceStatus::OnTrack,
    };

    for month in months {
        let base = baseline_by_month
            .get(&month)
            .map(|f| baseline_lines(f))
            .unwrap_or_default();
        let label = baseline_by_month
            .get(&month)
            .map_or_else(|| month_label(start_date, month), |f| f.label.clone());
        let (baseline_inflows, baseline_outflows) = split(&base);
        let baseline_net = baseline_inflows - baseline_outflows;

        let Some(actual) = actual_by_month.get(&month) else {
            rows.push(ComparisonRow {
                month,
                label,
                baseline_inflows,
                actual_inflows: Decimal::ZERO,
                baseline_outflows,
                actual_outflows: Decimal::ZERO,
                baseline_net,
                actual_net: Decimal::ZERO,
                net_variance: Decimal::ZERO,
                cumulative_variance,
                status: VarianceStatus::OnTrack,
                has_actuals: false,
                lines: Vec::new(),
            });
            continue;
        };

        let (actual_inflows, actual_outflows) = split(actual);
        let actual_net = actual_inflows - actual_outflows;
        let net_variance = actual_net - baseline_net;
        cumulative_variance += net_variance;

        let keys: BTreeSet<CashFlowLine> = base.keys().chain(actual.keys()).copied().collect();
        let lines = keys
            .into_iter()
            .map(|line| {
                let b = base.get(&line).copied().unwrap_or_default();
                let a = actual.get(&line).copied().unwrap_or_default();
                let entry = line_totals.entry(line).or_default();
                entry.0 += b;
                entry.1 += a;
                line_variance(line, b, a)
            })
            .collect();

        totals.months_reported += 1;
        totals.baseline_inflows += baseline_inflows;
        totals.actual_inflows += actual_inflows;
        totals.baseline_outflows += baseline_outflows;
        totals.actual_outflows += actual_outflows;
        totals.net_variance += net_variance;

        rows.push(ComparisonRow {
            month,
            label,
            baseline_inflows,
            actual_inflows,
            baseline_outflows,
            actual_outflows,
            baseline_net,
            actual_net,
            net_variance,
            cumulative_variance,
            status: VarianceStatus::from_variance(net_variance),
            has_actuals: true,
            lines,
        });
    }

    totals.status = VarianceStatus::from_variance(totals.net_variance);

    ComparisonReport {
        source,
        rows,
        by_line: line_totals
            .into_iter()
            .map(|(line, (b, a))| line_variance(line, b, a))
            .collect(),
        totals,
    }
}
