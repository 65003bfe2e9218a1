//! `SeaORM` Entity for scenario_baselines table.
//!
//! One row per projected month, written when a scenario is approved.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "scenario_baselines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub scenario_id: Uuid,
    pub revision: i64,
    pub month: i32,
    pub label: String,
    pub period_start: Date,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub inflows: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub outflows: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub project_net: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub financing_net: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub net: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub cumulative: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub project_cumulative: Decimal,
    #[sea_orm(column_type = "JsonBinary")]
    pub breakdown: Json,
    pub created_at: DateTimeWithTimeZone,
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
