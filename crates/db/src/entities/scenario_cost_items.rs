//! `SeaORM` Entity for scenario_cost_items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{CostCategory, CostDistribution};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "scenario_cost_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub scenario_id: Uuid,
    pub category: CostCategory,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub amount: Decimal,
    pub start_month: i32,
    pub duration_months: i32,
    pub distribution: CostDistribution,
    /// Monthly percentages for the custom distribution.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub custom_percentages: Option<Json>,
    pub sort_order: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::scenario_projects::Entity",
        from = "Column::ScenarioId",
        to = "super::scenario_projects::Column::Id",
        on_delete = "Cascade"
    )]
    ScenarioProjects,
}

impl Related<super::scenario_projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScenarioProjects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
