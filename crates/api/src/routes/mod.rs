//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod actuals;
pub mod cost_items;
pub mod credit_lines;
pub mod health;
pub mod projections;
pub mod scenarios;
pub mod units;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(scenarios::routes())
        .merge(cost_items::routes())
        .merge(credit_lines::routes())
        .merge(units::routes())
        .merge(actuals::routes())
        .merge(projections::routes())
}
