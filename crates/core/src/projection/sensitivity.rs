//! What-if adjustments and parallel sensitivity runs.

use cimiento_shared::types::cents;
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::cost::CostCategory;
use super::engine::{ProjectionEngine, ProjectionInput, ProjectionOptions};
use super::error::ProjectionError;
use super::metrics::ProjectionMetrics;
use super::period::ProjectMonth;

/// What an adjustment changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensitivityTarget {
    /// Unit list prices.
    SalesPrice,
    /// Cost item amounts, of one category or all of them.
    Cost {
        /// Category to adjust; every category when absent.
        #[serde(default)]
        category: Option<CostCategory>,
    },
    /// Annual rates of every credit line.
    InterestRate,
    /// Sale and delivery months, shifted by the adjusted amount.
    SalesDelay,
    /// Units sold per month.
    Absorption,
    /// Annual discount rate.
    DiscountRate,
}

/// Type of adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    /// Increase by a percentage.
    PercentageIncrease,
    /// Decrease by a percentage.
    PercentageDecrease,
    /// Set to a fixed amount.
    FixedAmount,
    /// Add a fixed amount.
    FixedIncrease,
    /// Subtract a fixed amount.
    FixedDecrease,
}

/// A single change applied to a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    /// What to change.
    pub target: SensitivityTarget,
    /// How to change it.
    pub adjustment_type: AdjustmentType,
    /// Adjustment value.
    pub value: Decimal,
}

/// A named set of adjustments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Variant name.
    pub name: String,
    /// Adjustments applied in order.
    pub adjustments: Vec<Adjustment>,
}

/// Applies an adjustment to a value.
#[must_use]
pub fn apply_adjustment(
    value: Decimal,
    adjustment_type: AdjustmentType,
    adjustment_value: Decimal,
) -> Decimal {
    match adjustment_type {
        AdjustmentType::PercentageIncrease => {
            value + (value * adjustment_value / Decimal::ONE_HUNDRED)
        }
        AdjustmentType::PercentageDecrease => {
            value - (value * adjustment_value / Decimal::ONE_HUNDRED)
        }
        AdjustmentType::FixedAmount => adjustment_value,
        AdjustmentType::FixedIncrease => value + adjustment_value,
        AdjustmentType::FixedDecrease => value - adjustment_value,
    }
}

/// Adjusts a whole-number quantity, rounding and flooring at zero.
fn adjust_count(value: u32, adjustment: &Adjustment) -> u32 {
    apply_adjustment(Decimal::from(value), adjustment.adjustment_type, adjustment.value)
        .round()
        .max(Decimal::ZERO)
        .to_u32()
        .unwrap_or(u32::MAX)
}

fn adjust_month(month: ProjectMonth, adjustment: &Adjustment) -> ProjectMonth {
    adjust_count(month, adjustment)
}

/// Returns a copy of `input` with every adjustment applied in order.
#[must_use]
pub fn apply(input: &ProjectionInput, adjustments: &[Adjustment]) -> ProjectionInput {
    let mut adjusted = input.clone();

    for adj in adjustments {
        let apply_to = |v: Decimal| apply_adjustment(v, adj.adjustment_type, adj.value);
        match adj.target {
            SensitivityTarget::SalesPrice => {
                for unit in &mut adjusted.units {
                    unit.list_price = apply_to(unit.list_price);
                }
            }
            SensitivityTarget::Cost { category } => {
                for item in &mut adjusted.costs {
                    if category.is_none_or(|c| c == item.category) {
                        item.amount = apply_to(item.amount);
                    }
                }
            }
            SensitivityTarget::InterestRate => {
                for line in &mut adjusted.credit_lines {
                    line.annual_rate = apply_to(line.annual_rate);
                }
            }
            SensitivityTarget::SalesDelay => {
                let sales = &mut adjusted.sales;
                sales.sales_start_month = adjust_month(sales.sales_start_month, adj);
                sales.default_delivery_month = adjust_month(sales.default_delivery_month, adj);
                for unit in &mut adjusted.units {
                    unit.sale_month = unit.sale_month.map(|m| adjust_month(m, adj));
                    unit.delivery_month = unit.delivery_month.map(|m| adjust_month(m, adj));
                }
            }
            SensitivityTarget::Absorption => {
                adjusted.sales.absorption_per_month =
                    adjust_count(adjusted.sales.absorption_per_month, adj);
            }
            SensitivityTarget::DiscountRate => {
                adjusted.discount_rate = apply_to(adjusted.discount_rate);
            }
        }
    }

    adjusted
}

/// Outcome of one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOutcome {
    /// Variant name.
    pub name: String,
    /// Metrics when the variant projected successfully.
    pub metrics: Option<ProjectionMetrics>,
    /// Error message when it did not.
    pub error: Option<String>,
    /// Equity NPV minus the base case equity NPV.
    #[serde(serialize_with = "cents::option")]
    pub npv_delta: Option<Decimal>,
    /// Equity IRR minus the base case equity IRR.
    pub irr_delta: Option<Decimal>,
}

/// Base case next to every variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityReport {
    /// Metrics of the unadjusted scenario.
    pub base: ProjectionMetrics,
    /// One outcome per variant, in request order.
    pub variants: Vec<VariantOutcome>,
}

/// Runs the base case and every variant in parallel.
///
/// A variant that fails to project is reported with its error; only a
/// failing base case fails the whole run.
pub fn run_sensitivity(
    input: &ProjectionInput,
    variants: &[Variant],
    options: &ProjectionOptions,
) -> Result<SensitivityReport, ProjectionError> {
    let base = ProjectionEngine::run(input, options)?.metrics;

    let outcomes = variants
        .par_iter()
        .map(|variant| {
            let adjusted = apply(input, &variant.adjustments);
            match ProjectionEngine::run(&adjusted, options) {
                Ok(result) => {
                    let metrics = result.metrics;
                    let npv_delta = metrics.equity.npv - base.equity.npv;
                    let irr_delta = metrics.equity.irr.zip(base.equity.irr).map(|(v, b)| v - b);
                    VariantOutcome {
                        name: variant.name.clone(),
                        metrics: Some(metrics),
                        error: None,
                        npv_delta: Some(npv_delta),
                        irr_delta,
                    }
                }
                Err(e) => VariantOutcome {
                    name: variant.name.clone(),
                    metrics: None,
                    error: Some(e.to_string()),
                    npv_delta: None,
                    irr_delta: None,
                },
            }
        })
        .collect();

    Ok(SensitivityReport {
        base,
        variants: outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::tests::sample_input;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn adjustment(target: SensitivityTarget, kind: AdjustmentType, value: Decimal) -> Adjustment {
        Adjustment {
            target,
            adjustment_type: kind,
            value,
        }
    }

    #[rstest]
    #[case(AdjustmentType::PercentageIncrease, dec!(10), dec!(110))]
    #[case(AdjustmentType::PercentageDecrease, dec!(10), dec!(90))]
    #[case(AdjustmentType::FixedAmount, dec!(50), dec!(50))]
    #[case(AdjustmentType::FixedIncrease, dec!(5), dec!(105))]
    #[case(AdjustmentType::FixedDecrease, dec!(5), dec!(95))]
    fn test_apply_adjustment(
        #[case] kind: AdjustmentType,
        #[case] value: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(apply_adjustment(dec!(100), kind, value), expected);
    }

    #[test]
    fn test_apply_cost_category_only() {
        let input = sample_input();
        let adjusted = apply(
            &input,
            &[adjustment(
                SensitivityTarget::Cost {
                    category: Some(CostCategory::Construction),
                },
                AdjustmentType::PercentageIncrease,
                dec!(10),
            )],
        );

        assert_eq!(adjusted.costs[0].amount, input.costs[0].amount);
        assert_eq!(adjusted.costs[1].amount, dec!(660000));
    }

    #[test]
    fn test_apply_sales_delay_shifts_months() {
        let mut input = sample_input();
        input.units[0].sale_month = Some(3);
        let adjusted = apply(
            &input,
            &[adjustment(
                SensitivityTarget::SalesDelay,
                AdjustmentType::FixedIncrease,
                dec!(2),
            )],
        );

        assert_eq!(adjusted.sales.sales_start_month, 4);
        assert_eq!(adjusted.sales.default_delivery_month, 14);
        assert_eq!(adjusted.units[0].sale_month, Some(5));
        assert_eq!(adjusted.units[1].sale_month, None);
    }

    #[test]
    fn test_apply_absorption_floors_at_zero() {
        let input = sample_input();
        let adjusted = apply(
            &input,
            &[adjustment(
                SensitivityTarget::Absorption,
                AdjustmentType::FixedDecrease,
                dec!(5),
            )],
        );
        assert_eq!(adjusted.sales.absorption_per_month, 0);
    }

    #[test]
    fn test_run_sensitivity() {
        let input = sample_input();
        let variants = vec![
            Variant {
                name: "Prices -10%".to_string(),
                adjustments: vec![adjustment(
                    SensitivityTarget::SalesPrice,
                    AdjustmentType::PercentageDecrease,
                    dec!(10),
                )],
            },
            Variant {
                name: "Higher rates".to_string(),
                adjustments: vec![adjustment(
                    SensitivityTarget::InterestRate,
                    AdjustmentType::FixedIncrease,
                    dec!(0.03),
                )],
            },
            Variant {
                name: "Stalled sales".to_string(),
                adjustments: vec![adjustment(
                    SensitivityTarget::Absorption,
                    AdjustmentType::FixedAmount,
                    dec!(0),
                )],
            },
        ];

        let report = run_sensitivity(&input, &variants, &ProjectionOptions::default()).unwrap();

        assert_eq!(report.variants.len(), 3);
        assert_eq!(report.variants[0].name, "Prices -10%");
        assert!(report.variants[0].npv_delta.unwrap() < Decimal::ZERO);
        assert!(report.variants[1].npv_delta.unwrap() < Decimal::ZERO);

        let stalled = &report.variants[2];
        assert!(stalled.metrics.is_none());
        assert!(stalled.error.as_deref().unwrap().contains("Absorption"));
    }

    #[test]
    fn test_base_failure_fails_run() {
        let mut input = sample_input();
        input.discount_rate = dec!(-0.1);
        assert_eq!(
            run_sensitivity(&input, &[], &ProjectionOptions::default()).unwrap_err(),
            ProjectionError::InvalidDiscountRate
        );
    }

    #[test]
    fn test_target_serde_shape() {
        let json = serde_json::to_value(SensitivityTarget::Cost {
            category: Some(CostCategory::Land),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"kind": "cost", "category": "land"}));

        let parsed: SensitivityTarget = serde_json::from_str(r#"{"kind":"cost"}"#).unwrap();
        assert_eq!(parsed, SensitivityTarget::Cost { category: None });
    }
}
