//! `SeaORM` Entity for scenario_credit_movements table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::CreditMovementKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "scenario_credit_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub credit_line_id: Uuid,
    pub month: i32,
    pub kind: CreditMovementKind,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::scenario_credit_lines::Entity",
        from = "Column::CreditLineId",
        to = "super::scenario_credit_lines::Column::Id",
        on_delete = "Cascade"
    )]
    ScenarioCreditLines,
}

impl Related<super::scenario_credit_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScenarioCreditLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
