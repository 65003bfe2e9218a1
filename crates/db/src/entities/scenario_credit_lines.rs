//! `SeaORM` Entity for scenario_credit_lines table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::InterestMode;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "scenario_credit_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub scenario_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub credit_limit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((9, 6)))")]
    pub annual_rate: Decimal,
    pub start_month: i32,
    pub term_months: i32,
    pub interest_mode: InterestMode,
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
    #[sea_orm(has_many = "super::scenario_credit_movements::Entity")]
    ScenarioCreditMovements,
}

impl Related<super::scenario_projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScenarioProjects.def()
    }
}

impl Related<super::scenario_credit_movements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScenarioCreditMovements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
