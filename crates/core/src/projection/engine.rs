//! Projection engine: turns a scenario into monthly cash flows and metrics.

use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use chrono::NaiveDate;
use cimiento_shared::types::{Currency, ScenarioProjectId, cents};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cashflow::{MonthlyCashFlow, assemble, equity_flows, project_flows, revenue_flows};
use super::cost::{CostCategory, CostItem, phase_costs};
use super::credit::{CreditLine, CreditSchedule, schedule_credit_line};
use super::error::ProjectionError;
use super::metrics::{FinancialMetrics, ProjectionMetrics, break_even};
use super::sales::{SalesAssumptions, SalesUnit, UnitSchedule, last_sales_month, schedule_sales};

/// Default longest horizon, in months.
pub const DEFAULT_MAX_HORIZON_MONTHS: u32 = 240;

/// Everything the engine needs to project one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionInput {
    /// Scenario project ID.
    pub project_id: ScenarioProjectId,
    /// Scenario name.
    pub name: String,
    /// Reporting currency.
    pub currency: Currency,
    /// Project start date; month 0 is the month containing it.
    pub start_date: NaiveDate,
    /// Planned duration in months.
    pub duration_months: u32,
    /// Annual discount rate for NPV.
    pub discount_rate: Decimal,
    /// Static cost items.
    pub costs: Vec<CostItem>,
    /// Credit lines.
    pub credit_lines: Vec<CreditLine>,
    /// Units for sale.
    pub units: Vec<SalesUnit>,
    /// Sales pace and pricing assumptions.
    pub sales: SalesAssumptions,
}

/// Engine options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectionOptions {
    /// Longest accepted horizon.
    pub max_horizon_months: u32,
    /// Replaces the scenario's discount rate when set.
    pub discount_rate_override: Option<Decimal>,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            max_horizon_months: DEFAULT_MAX_HORIZON_MONTHS,
            discount_rate_override: None,
        }
    }
}

/// Output of a projection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionResult {
    /// Unique ID of this run.
    pub projection_id: Uuid,
    /// Scenario project ID.
    pub project_id: ScenarioProjectId,
    /// Scenario name.
    pub name: String,
    /// Reporting currency.
    pub currency: Currency,
    /// Project start date.
    pub start_date: NaiveDate,
    /// Number of projected months.
    pub horizon_months: u32,
    /// Monthly cash flows.
    pub monthly: Vec<MonthlyCashFlow>,
    /// Total development cost by category.
    #[serde(serialize_with = "cents::map")]
    pub cost_totals: BTreeMap<CostCategory, Decimal>,
    /// Per-line credit schedules.
    pub credit: Vec<CreditSchedule>,
    /// Per-unit sales schedules.
    pub units: Vec<UnitSchedule>,
    /// Financial metrics.
    pub metrics: ProjectionMetrics,
    /// Non-fatal notes about the run.
    pub warnings: Vec<String>,
    /// Hash of input and options.
    pub parameters_hash: String,
    /// Whether the result came from the cache.
    pub cached: bool,
}

/// Stateless projection engine.
pub struct ProjectionEngine;

impl ProjectionEngine {
    /// Hashes input and options into a hex string.
    #[must_use]
    pub fn hash_input(input: &ProjectionInput, options: &ProjectionOptions) -> String {
        let mut hasher = DefaultHasher::new();
        serde_json::to_string(input)
            .unwrap_or_default()
            .hash(&mut hasher);
        options.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// Hashes the options alone.
    #[must_use]
    pub fn hash_options(options: &ProjectionOptions) -> u64 {
        let mut hasher = DefaultHasher::new();
        options.hash(&mut hasher);
        hasher.finish()
    }

    fn discount_rate(input: &ProjectionInput, options: &ProjectionOptions) -> Decimal {
        options.discount_rate_override.unwrap_or(input.discount_rate)
    }

    /// Number of months to project.
    ///
    /// The planned duration, extended to cover the last cost month, the last
    /// sales collection and every credit maturity.
    pub fn horizon(
        input: &ProjectionInput,
        options: &ProjectionOptions,
    ) -> Result<u32, ProjectionError> {
        let max = options.max_horizon_months;
        if input.duration_months == 0 || input.duration_months > max {
            return Err(ProjectionError::InvalidProjectDuration { max });
        }

        let last_cost = input.costs.iter().map(CostItem::last_month).max();
        let last_sale = last_sales_month(&input.units, &input.sales)?;
        let last_credit = input.credit_lines.iter().map(CreditLine::maturity_month).max();

        let horizon = [last_cost, last_sale, last_credit]
            .into_iter()
            .flatten()
            .map(|m| m.saturating_add(1))
            .fold(input.duration_months, u32::max);

        if horizon > max {
            return Err(ProjectionError::HorizonTooLong { horizon, max });
        }
        Ok(horizon)
    }

    /// Runs a full projection.
    pub fn run(
        input: &ProjectionInput,
        options: &ProjectionOptions,
    ) -> Result<ProjectionResult, ProjectionError> {
        let discount_rate = Self::discount_rate(input, options);
        if discount_rate < Decimal::ZERO || discount_rate > Decimal::ONE {
            return Err(ProjectionError::InvalidDiscountRate);
        }

        let horizon = Self::horizon(input, options)?;
        let mut warnings = Vec::new();
        if horizon > input.duration_months {
            warnings.push(format!(
                "Projection extended from {} to {horizon} months to cover all scheduled flows",
                input.duration_months
            ));
        }

        let costs = phase_costs(&input.costs, horizon)?;
        let sales = schedule_sales(&input.units, &input.sales, horizon)?;
        let credit = input
            .credit_lines
            .iter()
            .map(|line| schedule_credit_line(line, horizon))
            .collect::<Result<Vec<_>, _>>()?;
        warnings.extend(credit.iter().flat_map(|c| c.warnings.iter().cloned()));

        let monthly = assemble(input.start_date, horizon, &costs, &sales, &credit);

        let financing_cost: Decimal = credit.iter().map(|c| c.total_interest).sum();
        let project = FinancialMetrics::compute(
            &project_flows(&monthly),
            sales.total_revenue,
            costs.total,
            Decimal::ZERO,
            discount_rate,
        );
        let equity = FinancialMetrics::compute(
            &equity_flows(&monthly),
            sales.total_revenue,
            costs.total,
            financing_cost,
            discount_rate,
        );
        let break_even = break_even(
            &sales.units,
            &revenue_flows(&monthly),
            costs.total,
            financing_cost,
            sales.total_area,
        );

        if sales.total_revenue < costs.total + financing_cost {
            warnings.push("Projected revenue does not cover total cost".to_string());
        }

        Ok(ProjectionResult {
            projection_id: Uuid::new_v4(),
            project_id: input.project_id,
            name: input.name.clone(),
            currency: input.currency,
            start_date: input.start_date,
            horizon_months: horizon,
            monthly,
            cost_totals: costs.category_totals,
            credit,
            units: sales.units,
            metrics: ProjectionMetrics {
                discount_rate,
                project,
                equity,
                break_even,
            },
            warnings,
            parameters_hash: Self::hash_input(input, options),
            cached: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::tests::sample_input;
    use rust_decimal_macros::dec;

    #[test]
    fn test_horizon_extends_to_cover_flows() {
        let input = sample_input();
        // Delivery in month 12 and credit maturity in month 12 need 13 months
        let horizon = ProjectionEngine::horizon(&input, &ProjectionOptions::default()).unwrap();
        assert_eq!(horizon, 13);
    }

    #[test]
    fn test_horizon_too_long() {
        let input = sample_input();
        let options = ProjectionOptions {
            max_horizon_months: 12,
            ..ProjectionOptions::default()
        };
        assert_eq!(
            ProjectionEngine::horizon(&input, &options),
            Err(ProjectionError::HorizonTooLong {
                horizon: 13,
                max: 12
            })
        );
    }

    #[test]
    fn test_invalid_duration() {
        let mut input = sample_input();
        input.duration_months = 0;
        assert!(matches!(
            ProjectionEngine::run(&input, &ProjectionOptions::default()),
            Err(ProjectionError::InvalidProjectDuration { .. })
        ));
    }

    #[test]
    fn test_invalid_discount_rate() {
        let mut input = sample_input();
        input.discount_rate = dec!(1.5);
        assert_eq!(
            ProjectionEngine::run(&input, &ProjectionOptions::default()).unwrap_err(),
            ProjectionError::InvalidDiscountRate
        );
    }

    #[test]
    fn test_run_totals_and_identities() {
        let input = sample_input();
        let result = ProjectionEngine::run(&input, &ProjectionOptions::default()).unwrap();

        assert_eq!(result.horizon_months, 13);
        assert_eq!(result.monthly.len(), 13);
        assert!(!result.cached);
        assert_eq!(result.units.len(), 10);

        let project = &result.metrics.project;
        let equity = &result.metrics.equity;
        assert_eq!(project.total_revenue, dec!(1200000));
        assert_eq!(project.total_cost, dec!(800000));
        assert_eq!(project.financing_cost, Decimal::ZERO);
        assert_eq!(project.gross_profit, dec!(400000));

        let interest = result.credit[0].total_interest;
        assert!(interest > Decimal::ZERO);
        assert_eq!(equity.financing_cost, interest);
        assert_eq!(equity.gross_profit, dec!(400000) - interest);

        let last = result.monthly.last().unwrap();
        assert_eq!(last.project_cumulative, project.gross_profit);
        assert_eq!(last.cumulative, equity.gross_profit);

        // Leverage lowers the funding gap
        assert!(equity.peak_funding < project.peak_funding);
        assert!(project.irr.is_some());
        assert!(result.warnings.iter().any(|w| w.contains("extended")));
    }

    fn has_two_decimals(value: &serde_json::Value) -> bool {
        value
            .as_str()
            .and_then(|s| s.split_once('.'))
            .is_some_and(|(_, frac)| frac.len() == 2)
    }

    #[test]
    fn test_money_serializes_with_cents() {
        let result = ProjectionEngine::run(&sample_input(), &ProjectionOptions::default()).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        let project = &json["metrics"]["project"];
        assert_eq!(project["total_revenue"], "1200000.00");
        assert_eq!(project["total_cost"], "800000.00");
        assert_eq!(project["financing_cost"], "0.00");
        assert_eq!(json["monthly"][0]["outflows"], "200000.00");

        for month in json["monthly"].as_array().unwrap() {
            for field in ["inflows", "outflows", "net", "cumulative", "project_cumulative"] {
                assert!(has_two_decimals(&month[field]), "{field}: {}", month[field]);
            }
            for amount in month["breakdown"].as_object().unwrap().values() {
                assert!(has_two_decimals(amount), "breakdown: {amount}");
            }
        }
        for row in json["credit"][0]["months"].as_array().unwrap() {
            assert!(has_two_decimals(&row["closing"]));
        }
        assert!(has_two_decimals(&json["units"][0]["net_price"]));
    }

    #[test]
    fn test_discount_rate_override() {
        let input = sample_input();
        let base = ProjectionEngine::run(&input, &ProjectionOptions::default()).unwrap();
        let options = ProjectionOptions {
            discount_rate_override: Some(Decimal::ZERO),
            ..ProjectionOptions::default()
        };
        let undiscounted = ProjectionEngine::run(&input, &options).unwrap();

        assert_eq!(undiscounted.metrics.discount_rate, Decimal::ZERO);
        assert_eq!(undiscounted.metrics.project.npv, dec!(400000));
        assert!(base.metrics.project.npv < undiscounted.metrics.project.npv);
        assert_ne!(base.parameters_hash, undiscounted.parameters_hash);
    }

    #[test]
    fn test_hash_is_stable() {
        let input = sample_input();
        let options = ProjectionOptions::default();
        assert_eq!(
            ProjectionEngine::hash_input(&input, &options),
            ProjectionEngine::hash_input(&input, &options)
        );
    }

    #[test]
    fn test_credit_limit_error_propagates() {
        let mut input = sample_input();
        input.credit_lines[0].limit = dec!(300000);
        assert!(matches!(
            ProjectionEngine::run(&input, &ProjectionOptions::default()),
            Err(ProjectionError::CreditLimitExceeded { month: 5, .. })
        ));
    }

    #[test]
    fn test_empty_scenario() {
        let mut input = sample_input();
        input.costs.clear();
        input.credit_lines.clear();
        input.units.clear();

        let result = ProjectionEngine::run(&input, &ProjectionOptions::default()).unwrap();
        assert_eq!(result.horizon_months, 12);
        assert!(result.monthly.iter().all(|m| m.net.is_zero()));
        assert_eq!(result.metrics.project.irr, None);
        assert_eq!(result.metrics.project.payback_months, Some(Decimal::ZERO));
    }
}
