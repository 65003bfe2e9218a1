//! Entity re-exports.

pub use super::scenario_actuals::Entity as ScenarioActuals;
pub use super::scenario_baselines::Entity as ScenarioBaselines;
pub use super::scenario_cost_items::Entity as ScenarioCostItems;
pub use super::scenario_credit_lines::Entity as ScenarioCreditLines;
pub use super::scenario_credit_movements::Entity as ScenarioCreditMovements;
pub use super::scenario_projects::Entity as ScenarioProjects;
pub use super::scenario_units::Entity as ScenarioUnits;
