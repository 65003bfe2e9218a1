//! Credit line routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{error_response, json_error},
};
use cimiento_core::projection::{InterestMode, MovementKind, ProjectMonth};
use cimiento_db::repositories::{CreditLineRepository, NewCreditLine, NewCreditMovement};
use cimiento_shared::types::ScenarioProjectId;

/// Creates the credit line routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/scenarios/{id}/credit-lines",
            get(list_credit_lines).post(create_credit_line),
        )
        .route("/scenarios/{id}/credit-lines/{line_id}", delete(delete_credit_line))
        .route(
            "/scenarios/{id}/credit-lines/{line_id}/movements",
            post(add_movement),
        )
        .route(
            "/scenarios/{id}/credit-lines/{line_id}/movements/{movement_id}",
            delete(delete_movement),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// A scheduled drawdown or repayment.
#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    /// Month of the movement.
    pub month: ProjectMonth,
    /// `drawdown` or `repayment`.
    pub kind: MovementKind,
    /// Amount moved.
    pub amount: Decimal,
    /// Optional note.
    #[serde(default)]
    pub note: Option<String>,
}

impl From<MovementRequest> for NewCreditMovement {
    fn from(r: MovementRequest) -> Self {
        Self {
            month: r.month,
            kind: r.kind,
            amount: r.amount,
            note: r.note,
        }
    }
}

/// Request body for creating a credit line.
#[derive(Debug, Deserialize)]
pub struct CreateCreditLineRequest {
    /// Display name.
    pub name: String,
    /// Maximum principal.
    pub limit: Decimal,
    /// Nominal annual rate, e.g. "0.09".
    pub annual_rate: Decimal,
    /// First month.
    #[serde(default)]
    pub start_month: ProjectMonth,
    /// Term in months.
    pub term_months: u32,
    /// `capitalized` or `paid`.
    pub interest_mode: InterestMode,
    /// Initial movements.
    #[serde(default)]
    pub movements: Vec<MovementRequest>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /scenarios/{id}/credit-lines
async fn list_credit_lines(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = CreditLineRepository::new((*state.db).clone());
    match repo.list(id).await {
        Ok(lines) => (StatusCode::OK, Json(json!({ "credit_lines": lines }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /scenarios/{id}/credit-lines
async fn create_credit_line(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateCreditLineRequest>,
) -> impl IntoResponse {
    if request.name.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "invalid_name", "Name cannot be empty");
    }

    let input = NewCreditLine {
        name: request.name,
        limit: request.limit,
        annual_rate: request.annual_rate,
        start_month: request.start_month,
        term_months: request.term_months,
        interest_mode: request.interest_mode,
        movements: request
            .movements
            .into_iter()
            .map(NewCreditMovement::from)
            .collect(),
    };

    let repo = CreditLineRepository::new((*state.db).clone());
    match repo.create(id, input).await {
        Ok(line) => {
            info!(
                scenario_id = %id,
                line_id = %line.line.id,
                movements = line.movements.len(),
                "Credit line created"
            );
            state.cache.invalidate_project(ScenarioProjectId::from_uuid(id));
            (StatusCode::CREATED, Json(line)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /scenarios/{id}/credit-lines/{line_id}
async fn delete_credit_line(
    State(state): State<AppState>,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let repo = CreditLineRepository::new((*state.db).clone());
    match repo.delete_line(id, line_id).await {
        Ok(()) => {
            info!(scenario_id = %id, line_id = %line_id, "Credit line deleted");
            state.cache.invalidate_project(ScenarioProjectId::from_uuid(id));
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /scenarios/{id}/credit-lines/{line_id}/movements
async fn add_movement(
    State(state): State<AppState>,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<MovementRequest>,
) -> impl IntoResponse {
    let repo = CreditLineRepository::new((*state.db).clone());
    match repo.add_movement(id, line_id, request.into()).await {
        Ok(movement) => {
            info!(
                scenario_id = %id,
                line_id = %line_id,
                month = movement.month,
                amount = %movement.amount,
                "Credit movement added"
            );
            state.cache.invalidate_project(ScenarioProjectId::from_uuid(id));
            (StatusCode::CREATED, Json(movement)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /scenarios/{id}/credit-lines/{line_id}/movements/{movement_id}
async fn delete_movement(
    State(state): State<AppState>,
    Path((id, line_id, movement_id)): Path<(Uuid, Uuid, Uuid)>,
) -> impl IntoResponse {
    let repo = CreditLineRepository::new((*state.db).clone());
    match repo.delete_movement(id, line_id, movement_id).await {
        Ok(()) => {
            info!(scenario_id = %id, movement_id = %movement_id, "Credit movement deleted");
            state.cache.invalidate_project(ScenarioProjectId::from_uuid(id));
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_request_parsing() {
        let request: CreateCreditLineRequest = serde_json::from_str(
            r#"{
                "name": "Construction loan",
                "limit": "400000",
                "annual_rate": "0.09",
                "start_month": 1,
                "term_months": 12,
                "interest_mode": "paid",
                "movements": [
                    {"month": 2, "kind": "drawdown", "amount": "250000"},
                    {"month": 5, "kind": "drawdown", "amount": "150000", "note": "Second tranche"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(request.interest_mode, InterestMode::Paid);
        assert_eq!(request.movements.len(), 2);
        assert_eq!(request.movements[1].kind, MovementKind::Drawdown);
        assert_eq!(request.movements[1].amount, dec!(150000));
    }
}
