//! `SeaORM` Entity for scenario_projects table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ScenarioStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "scenario_projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub currency: String,
    pub start_date: Date,
    pub duration_months: i32,
    #[sea_orm(column_type = "Decimal(Some((9, 6)))")]
    pub discount_rate: Decimal,
    pub sales_start_month: i32,
    pub absorption_per_month: i32,
    pub default_delivery_month: i32,
    #[sea_orm(column_type = "Decimal(Some((9, 6)))")]
    pub monthly_price_escalation: Decimal,
    pub status: ScenarioStatus,
    pub revision: i64,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::scenario_cost_items::Entity")]
    ScenarioCostItems,
    #[sea_orm(has_many = "super::scenario_credit_lines::Entity")]
    ScenarioCreditLines,
    #[sea_orm(has_many = "super::scenario_units::Entity")]
    ScenarioUnits,
    #[sea_orm(has_many = "super::scenario_actuals::Entity")]
    ScenarioActuals,
    #[sea_orm(has_many = "super::scenario_baselines::Entity")]
    ScenarioBaselines,
}

impl Related<super::scenario_cost_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScenarioCostItems.def()
    }
}

impl Related<super::scenario_credit_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScenarioCreditLines.def()
    }
}

impl Related<super::scenario_units::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScenarioUnits.def()
    }
}

impl Related<super::scenario_actuals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScenarioActuals.def()
    }
}

impl Related<super::scenario_baselines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScenarioBaselines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
