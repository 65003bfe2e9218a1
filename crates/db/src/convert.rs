//! Conversions between database rows and projection engine types.

use std::collections::BTreeMap;

use cimiento_core::projection::{
    self as engine, ActualEntry, CashFlowLine, CostItem, CreditLine, CreditMovement,
    MonthlyCashFlow, ProjectMonth, SalesAssumptions, SalesUnit,
};
use cimiento_shared::types::{
    ActualEntryId, CostItemId, CreditLineId, Currency, SalesUnitId, ScenarioProjectId,
};
use rust_decimal::Decimal;

use crate::entities::{
    scenario_actuals, scenario_baselines, scenario_cost_items, scenario_credit_lines,
    scenario_credit_movements, scenario_projects, scenario_units,
    sea_orm_active_enums::{
        CostCategory, CostDistribution, CreditMovementKind, InterestMode, UnitStatus,
    },
};

/// Errors converting stored rows into engine types.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// A month or count column holds a negative value.
    #[error("Invalid {field}: {value}")]
    NegativeMonth {
        /// Column name.
        field: &'static str,
        /// Stored value.
        value: i64,
    },

    /// Custom percentages are not a JSON array of decimals.
    #[error("Invalid custom percentages: {0}")]
    InvalidPercentages(String),

    /// Stored line key is unknown.
    #[error("Invalid cash-flow line: {0}")]
    InvalidLineKey(String),

    /// Stored currency code is unknown.
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Stored breakdown is not a map of decimals.
    #[error("Invalid baseline breakdown: {0}")]
    InvalidBreakdown(String),
}

/// Converts a stored month to a project month.
pub fn to_month(field: &'static str, value: i32) -> Result<ProjectMonth, ConvertError> {
    u32::try_from(value).map_err(|_| ConvertError::NegativeMonth {
        field,
        value: i64::from(value),
    })
}

/// Converts a project month to its stored form, saturating at `i32::MAX`.
#[must_use]
pub fn from_month(month: ProjectMonth) -> i32 {
    i32::try_from(month).unwrap_or(i32::MAX)
}

impl From<CostCategory> for engine::CostCategory {
    fn from(value: CostCategory) -> Self {
        match value {
            CostCategory::Land => Self::Land,
            CostCategory::Construction => Self::Construction,
            CostCategory::SoftCosts => Self::SoftCosts,
            CostCategory::Marketing => Self::Marketing,
            CostCategory::Payroll => Self::Payroll,
            CostCategory::Administrative => Self::Administrative,
            CostCategory::Commissions => Self::Commissions,
            CostCategory::Contingency => Self::Contingency,
            CostCategory::Other => Self::Other,
        }
    }
}

impl From<engine::CostCategory> for CostCategory {
    fn from(value: engine::CostCategory) -> Self {
        match value {
            engine::CostCategory::Land => Self::Land,
            engine::CostCategory::Construction => Self::Construction,
            engine::CostCategory::SoftCosts => Self::SoftCosts,
            engine::CostCategory::Marketing => Self::Marketing,
            engine::CostCategory::Payroll => Self::Payroll,
            engine::CostCategory::Administrative => Self::Administrative,
            engine::CostCategory::Commissions => Self::Commissions,
            engine::CostCategory::Contingency => Self::Contingency,
            engine::CostCategory::Other => Self::Other,
        }
    }
}

impl From<InterestMode> for engine::InterestMode {
    fn from(value: InterestMode) -> Self {
        match value {
            InterestMode::Capitalized => Self::Capitalized,
            InterestMode::Paid => Self::Paid,
        }
    }
}

impl From<engine::InterestMode> for InterestMode {
    fn from(value: engine::InterestMode) -> Self {
        match value {
            engine::InterestMode::Capitalized => Self::Capitalized,
            engine::InterestMode::Paid => Self::Paid,
        }
    }
}

impl From<CreditMovementKind> for engine::MovementKind {
    fn from(value: CreditMovementKind) -> Self {
        match value {
            CreditMovementKind::Drawdown => Self::Drawdown,
            CreditMovementKind::Repayment => Self::Repayment,
        }
    }
}

impl From<engine::MovementKind> for CreditMovementKind {
    fn from(value: engine::MovementKind) -> Self {
        match value {
            engine::MovementKind::Drawdown => Self::Drawdown,
            engine::MovementKind::Repayment => Self::Repayment,
        }
    }
}

impl From<UnitStatus> for engine::UnitStatus {
    fn from(value: UnitStatus) -> Self {
        match value {
            UnitStatus::Available => Self::Available,
            UnitStatus::Reserved => Self::Reserved,
            UnitStatus::Sold => Self::Sold,
            UnitStatus::Delivered => Self::Delivered,
        }
    }
}

impl From<engine::UnitStatus> for UnitStatus {
    fn from(value: engine::UnitStatus) -> Self {
        match value {
            engine::UnitStatus::Available => Self::Available,
            engine::UnitStatus::Reserved => Self::Reserved,
            engine::UnitStatus::Sold => Self::Sold,
            engine::UnitStatus::Delivered => Self::Delivered,
        }
    }
}

/// Splits an engine distribution into its stored enum and percentages.
#[must_use]
pub fn distribution_to_db(
    distribution: &engine::Distribution,
) -> (CostDistribution, Option<serde_json::Value>) {
    match distribution {
        engine::Distribution::Lump => (CostDistribution::Lump, None),
        engine::Distribution::Uniform => (CostDistribution::Uniform, None),
        engine::Distribution::SCurve => (CostDistribution::SCurve, None),
        engine::Distribution::Custom(percentages) => (
            CostDistribution::Custom,
            Some(serde_json::Value::Array(
                percentages
                    .iter()
                    .map(|p| serde_json::Value::String(p.to_string()))
                    .collect(),
            )),
        ),
    }
}

/// Rebuilds an engine distribution from its stored form.
pub fn distribution_from_db(
    kind: CostDistribution,
    percentages: Option<&serde_json::Value>,
) -> Result<engine::Distribution, ConvertError> {
    Ok(match kind {
        CostDistribution::Lump => engine::Distribution::Lump,
        CostDistribution::Uniform => engine::Distribution::Uniform,
        CostDistribution::SCurve => engine::Distribution::SCurve,
        CostDistribution::Custom => {
            let value = percentages
                .ok_or_else(|| ConvertError::InvalidPercentages("missing".to_string()))?;
            let parsed: Vec<Decimal> = serde_json::from_value(value.clone())
                .map_err(|e| ConvertError::InvalidPercentages(e.to_string()))?;
            engine::Distribution::Custom(parsed)
        }
    })
}

/// Builds an engine cost item from a stored row.
pub fn cost_item(model: &scenario_cost_items::Model) -> Result<CostItem, ConvertError> {
    Ok(CostItem {
        id: CostItemId::from_uuid(model.id),
        category: model.category.into(),
        description: model.description.clone(),
        amount: model.amount,
        start_month: to_month("start_month", model.start_month)?,
        duration_months: to_month("duration_months", model.duration_months)?,
        distribution: distribution_from_db(model.distribution, model.custom_percentages.as_ref())?,
    })
}

/// Builds an engine credit line from a stored line and its movements.
pub fn credit_line(
    model: &scenario_credit_lines::Model,
    movements: &[scenario_credit_movements::Model],
) -> Result<CreditLine, ConvertError> {
    Ok(CreditLine {
        id: CreditLineId::from_uuid(model.id),
        name: model.name.clone(),
        limit: model.credit_limit,
        annual_rate: model.annual_rate,
        start_month: to_month("start_month", model.start_month)?,
        term_months: to_month("term_months", model.term_months)?,
        interest_mode: model.interest_mode.into(),
        movements: movements
            .iter()
            .map(|m| {
                Ok(CreditMovement {
                    month: to_month("month", m.month)?,
                    kind: m.kind.into(),
                    amount: m.amount,
                })
            })
            .collect::<Result<_, ConvertError>>()?,
    })
}

/// Builds an engine sales unit from a stored row.
pub fn sales_unit(model: &scenario_units::Model) -> Result<SalesUnit, ConvertError> {
    Ok(SalesUnit {
        id: SalesUnitId::from_uuid(model.id),
        code: model.code.clone(),
        typology: model.typology.clone(),
        area_m2: model.area_m2,
        list_price: model.list_price,
        discount_pct: model.discount_pct,
        status: model.status.into(),
        sale_month: model.sale_month.map(|m| to_month("sale_month", m)).transpose()?,
        delivery_month: model
            .delivery_month
            .map(|m| to_month("delivery_month", m))
            .transpose()?,
        down_payment_pct: model.down_payment_pct,
        down_payment_installments: to_month(
            "down_payment_installments",
            model.down_payment_installments,
        )?,
    })
}

/// Sales assumptions stored on the scenario row.
pub fn sales_assumptions(
    model: &scenario_projects::Model,
) -> Result<SalesAssumptions, ConvertError> {
    Ok(SalesAssumptions {
        sales_start_month: to_month("sales_start_month", model.sales_start_month)?,
        absorption_per_month: to_month("absorption_per_month", model.absorption_per_month)?,
        default_delivery_month: to_month("default_delivery_month", model.default_delivery_month)?,
        monthly_price_escalation: model.monthly_price_escalation,
    })
}

/// Parses the stored currency code.
pub fn currency(model: &scenario_projects::Model) -> Result<Currency, ConvertError> {
    model
        .currency
        .parse()
        .map_err(|_| ConvertError::InvalidCurrency(model.currency.clone()))
}

/// Typed ID of a scenario row.
#[must_use]
pub const fn scenario_id(model: &scenario_projects::Model) -> ScenarioProjectId {
    ScenarioProjectId::from_uuid(model.id)
}

/// Builds an engine actual entry from a stored row.
pub fn actual_entry(model: &scenario_actuals::Model) -> Result<ActualEntry, ConvertError> {
    Ok(ActualEntry {
        month: to_month("month", model.month)?,
        line: model
            .line_key
            .parse::<CashFlowLine>()
            .map_err(ConvertError::InvalidLineKey)?,
        amount: model.amount,
    })
}

/// Typed ID of an actual row.
#[must_use]
pub const fn actual_id(model: &scenario_actuals::Model) -> ActualEntryId {
    ActualEntryId::from_uuid(model.id)
}

/// Rebuilds a monthly cash flow from a baseline row.
pub fn baseline_month(
    model: &scenario_baselines::Model,
) -> Result<MonthlyCashFlow, ConvertError> {
    let breakdown: BTreeMap<String, Decimal> = serde_json::from_value(model.breakdown.clone())
        .map_err(|e| ConvertError::InvalidBreakdown(e.to_string()))?;

    Ok(MonthlyCashFlow {
        month: to_month("month", model.month)?,
        label: model.label.clone(),
        period_start: model.period_start,
        inflows: model.inflows,
        outflows: model.outflows,
        project_net: model.project_net,
        financing_net: model.financing_net,
        net: model.net,
        cumulative: model.cumulative,
        project_cumulative: model.project_cumulative,
        breakdown,
    })
}

/// Serializes a monthly breakdown for storage.
#[must_use]
pub fn breakdown_to_json(breakdown: &BTreeMap<String, Decimal>) -> serde_json::Value {
    serde_json::Value::Object(
        breakdown
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.to_string())))
            .collect(),
    )
}
