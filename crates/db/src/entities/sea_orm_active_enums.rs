//! Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "scenario_status")]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Editable working copy.
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Baseline captured; structure locked.
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Read-only.
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "cost_category")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum CostCategory {
    #[sea_orm(string_value = "land")]
    Land,
    #[sea_orm(string_value = "construction")]
    Construction,
    #[sea_orm(string_value = "soft_costs")]
    SoftCosts,
    #[sea_orm(string_value = "marketing")]
    Marketing,
    #[sea_orm(string_value = "payroll")]
    Payroll,
    #[sea_orm(string_value = "administrative")]
    Administrative,
    #[sea_orm(string_value = "commissions")]
    Commissions,
    #[sea_orm(string_value = "contingency")]
    Contingency,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "cost_distribution")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum CostDistribution {
    #[sea_orm(string_value = "lump")]
    Lump,
    #[sea_orm(string_value = "uniform")]
    Uniform,
    #[sea_orm(string_value = "s_curve")]
    SCurve,
    #[sea_orm(string_value = "custom")]
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "interest_mode")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum InterestMode {
    #[sea_orm(string_value = "capitalized")]
    Capitalized,
    #[sea_orm(string_value = "paid")]
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "credit_movement_kind")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum CreditMovementKind {
    #[sea_orm(string_value = "drawdown")]
    Drawdown,
    #[sea_orm(string_value = "repayment")]
    Repayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "unit_status")]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum UnitStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "reserved")]
    Reserved,
    #[sea_orm(string_value = "sold")]
    Sold,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}
