//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every scenario mutation goes through the edit guard, which locks the
//! scenario row and enforces the lifecycle rules.

pub mod actual;
pub mod cost_item;
pub mod credit_line;
mod guard;
pub mod projection;
pub mod sales_unit;
pub mod scenario;

pub use actual::{ActualError, ActualRepository, NewActual};
pub use cost_item::{CostItemError, CostItemRepository, NewCostItem};
pub use credit_line::{
    CreditLineError, CreditLineRepository, CreditLineWithMovements, NewCreditLine,
    NewCreditMovement,
};
pub use projection::{ComparisonData, LoadedScenario, ProjectionRepoError, ProjectionRepository};
pub use sales_unit::{NewSalesUnit, SalesUnitError, SalesUnitRepository, UpdateSalesUnit};
pub use scenario::{
    CreateScenarioInput, ScenarioError, ScenarioFilter, ScenarioRepository, UpdateScenarioInput,
};
