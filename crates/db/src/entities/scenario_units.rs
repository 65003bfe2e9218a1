//! `SeaORM` Entity for scenario_units table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::UnitStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "scenario_units")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub scenario_id: Uuid,
    pub code: String,
    pub typology: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub area_m2: Decimal,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub list_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub discount_pct: Decimal,
    pub status: UnitStatus,
    pub sale_month: Option<i32>,
    pub delivery_month: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub down_payment_pct: Decimal,
    pub down_payment_installments: i32,
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
