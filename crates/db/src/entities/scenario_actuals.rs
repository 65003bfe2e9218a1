//! `SeaORM` Entity for scenario_actuals table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "scenario_actuals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub scenario_id: Uuid,
    pub month: i32,
    /// Cash-flow line key, e.g. `cost:construction` or `sales_delivery`.
    pub line_key: String,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
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
