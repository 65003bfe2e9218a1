//! Static cost items with time-phased amortization.

use std::collections::BTreeMap;

use cimiento_shared::types::{CostItemId, cents, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::allocation::{s_curve_weights, spread_by_weights, spread_equal};
use super::error::ProjectionError;
use super::period::ProjectMonth;

/// Tolerance when checking that custom percentages add up to 100.
const PERCENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Category of a development cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    /// Land acquisition.
    Land,
    /// Hard construction costs.
    Construction,
    /// Design, permits, legal and other soft costs.
    SoftCosts,
    /// Marketing and advertising.
    Marketing,
    /// Project team payroll.
    Payroll,
    /// Administrative overhead.
    Administrative,
    /// Sales commissions.
    Commissions,
    /// Contingency reserve.
    Contingency,
    /// Anything else.
    Other,
}

impl CostCategory {
    /// All categories in display order.
    pub const ALL: [Self; 9] = [
        Self::Land,
        Self::Construction,
        Self::SoftCosts,
        Self::Marketing,
        Self::Payroll,
        Self::Administrative,
        Self::Commissions,
        Self::Contingency,
        Self::Other,
    ];

    /// Returns the snake_case name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Land => "land",
            Self::Construction => "construction",
            Self::SoftCosts => "soft_costs",
            Self::Marketing => "marketing",
            Self::Payroll => "payroll",
            Self::Administrative => "administrative",
            Self::Commissions => "commissions",
            Self::Contingency => "contingency",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for CostCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CostCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown cost category: {s}"))
    }
}

/// How a cost item's amount is spread across months.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "percentages", rename_all = "snake_case")]
pub enum Distribution {
    /// The whole amount falls in the start month.
    Lump,
    /// Equal parts over the duration.
    Uniform,
    /// Triangular ramp-up and ramp-down over the duration.
    SCurve,
    /// Explicit monthly percentages summing to 100.
    Custom(Vec<Decimal>),
}

/// A static cost line of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostItem {
    /// Cost item ID.
    pub id: CostItemId,
    /// Cost category.
    pub category: CostCategory,
    /// Free-text description.
    pub description: String,
    /// Total amount to spread.
    #[serde(serialize_with = "cents::serialize")]
    pub amount: Decimal,
    /// First month the cost is incurred.
    pub start_month: ProjectMonth,
    /// Number of months for uniform and S-curve spreading.
    pub duration_months: u32,
    /// Spreading rule.
    pub distribution: Distribution,
}

impl CostItem {
    /// Checks amount, span, and custom percentages.
    pub fn validate(&self) -> Result<(), ProjectionError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(ProjectionError::NegativeAmount(format!(
                "cost item '{}'",
                self.description
            )));
        }

        match &self.distribution {
            Distribution::Lump => Ok(()),
            Distribution::Uniform | Distribution::SCurve => {
                if self.duration_months == 0 {
                    Err(ProjectionError::InvalidDuration(self.description.clone()))
                } else {
                    Ok(())
                }
            }
            Distribution::Custom(percentages) => {
                if percentages.is_empty() {
                    return Err(ProjectionError::InvalidDuration(self.description.clone()));
                }
                let sum: Decimal = percentages.iter().copied().sum();
                let negative = percentages.iter().any(|p| p.is_sign_negative() && !p.is_zero());
                if negative || (sum - Decimal::ONE_HUNDRED).abs() > PERCENT_TOLERANCE {
                    return Err(ProjectionError::InvalidDistribution {
                        item: self.description.clone(),
                        sum,
                    });
                }
                Ok(())
            }
        }
    }

    /// Number of months the item touches.
    #[must_use]
    pub fn span(&self) -> u32 {
        match &self.distribution {
            Distribution::Lump => 1,
            Distribution::Uniform | Distribution::SCurve => self.duration_months.max(1),
            Distribution::Custom(percentages) => {
                u32::try_from(percentages.len()).unwrap_or(u32::MAX).max(1)
            }
        }
    }

    /// Last month in which the item has an amount.
    #[must_use]
    pub fn last_month(&self) -> ProjectMonth {
        self.start_month.saturating_add(self.span() - 1)
    }
}

/// Spreads a cost item into a per-month vector of length `horizon`.
pub fn phase_cost_item(item: &CostItem, horizon: u32) -> Result<Vec<Decimal>, ProjectionError> {
    item.validate()?;

    if item.last_month() >= horizon {
        return Err(ProjectionError::BeyondHorizon {
            month: item.last_month(),
            horizon,
        });
    }

    let parts = match &item.distribution {
        Distribution::Lump => vec![round_money(item.amount)],
        Distribution::Uniform => spread_equal(item.amount, item.span() as usize),
        Distribution::SCurve => {
            spread_by_weights(item.amount, &s_curve_weights(item.span() as usize))
        }
        Distribution::Custom(percentages) => spread_by_weights(item.amount, percentages),
    };

    let mut monthly = vec![Decimal::ZERO; horizon as usize];
    for (offset, part) in parts.into_iter().enumerate() {
        monthly[item.start_month as usize + offset] += part;
    }

    Ok(monthly)
}

/// Phased costs of a whole scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSchedule {
    /// Per-month amounts by category.
    pub by_category: BTreeMap<CostCategory, Vec<Decimal>>,
    /// Per-month total across categories.
    #[serde(serialize_with = "cents::vec")]
    pub monthly_total: Vec<Decimal>,
    /// Total by category.
    #[serde(serialize_with = "cents::map")]
    pub category_totals: BTreeMap<CostCategory, Decimal>,
    /// Grand total.
    #[serde(serialize_with = "cents::serialize")]
    pub total: Decimal,
}

/// Phases every cost item and groups the result by category.
pub fn phase_costs(items: &[CostItem], horizon: u32) -> Result<CostSchedule, ProjectionError> {
    let mut by_category: BTreeMap<CostCategory, Vec<Decimal>> = BTreeMap::new();
    let mut monthly_total = vec![Decimal::ZERO; horizon as usize];

    for item in items {
        let monthly = phase_cost_item(item, horizon)?;
        let bucket = by_category
            .entry(item.category)
            .or_insert_with(|| vec![Decimal::ZERO; horizon as usize]);
        for (month, amount) in monthly.into_iter().enumerate() {
            bucket[month] += amount;
            monthly_total[month] += amount;
        }
    }

    let category_totals: BTreeMap<CostCategory, Decimal> = by_category
        .iter()
        .map(|(category, months)| (*category, months.iter().copied().sum()))
        .collect();
    let total = monthly_total.iter().copied().sum();

    Ok(CostSchedule {
        by_category,
        monthly_total,
        category_totals,
        total,
    })
}
