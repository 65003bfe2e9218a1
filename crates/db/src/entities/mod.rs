//! `SeaORM` entities for the scenario schema.

pub mod prelude;

pub mod scenario_actuals;
pub mod scenario_baselines;
pub mod scenario_cost_items;
pub mod scenario_credit_lines;
pub mod scenario_credit_movements;
pub mod scenario_projects;
pub mod scenario_units;
pub mod sea_orm_active_enums;
