//! Scenario cash-flow projection and financial metrics.
//!
//! A scenario is a set of cost items, credit lines, and units for sale.
//! The engine phases each source into monthly amounts, assembles the
//! monthly cash flow, and derives NPV, IRR, payback, and break-even for
//! both the unleveraged project and the leveraged equity position.

pub mod allocation;
pub mod cache;
pub mod cashflow;
pub mod comparison;
pub mod cost;
pub mod credit;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod period;
pub mod sales;
pub mod sensitivity;


pub use cache::ProjectionCache;
pub use cashflow::{CashFlowLine, MonthlyCashFlow};
pub use comparison::{ActualEntry, BaselineSource, ComparisonReport, VarianceStatus, compare};
pub use cost::{CostCategory, CostItem, Distribution};
pub use credit::{CreditLine, CreditMovement, CreditSchedule, InterestMode, MovementKind};
pub use engine::{ProjectionEngine, ProjectionInput, ProjectionOptions, ProjectionResult};
pub use error::ProjectionError;
pub use metrics::{BreakEven, FinancialMetrics, ProjectionMetrics};
pub use period::ProjectMonth;
pub use sales::{SalesAssumptions, SalesUnit, UnitSchedule, UnitStatus};
pub use sensitivity::{
    Adjustment, AdjustmentType, SensitivityReport, SensitivityTarget, Variant, run_sensitivity,
};
