//! Actuals routes: record real monthly amounts per cash-flow line.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
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
use cimiento_core::projection::{CashFlowLine, ProjectMonth};
use cimiento_db::repositories::{ActualRepository, NewActual};

/// Creates the actuals routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/scenarios/{id}/actuals",
            get(list_actuals).post(record_actuals),
        )
        .route("/scenarios/{id}/actuals/{actual_id}", delete(delete_actual))
}

// ============================================================================
// Request Types
// ============================================================================

/// One recorded amount.
#[derive(Debug, Deserialize)]
pub struct ActualRequest {
    /// Project month.
    pub month: ProjectMonth,
    /// Line key, e.g. `cost:construction` or `sales_delivery`.
    pub line: CashFlowLine,
    /// Amount, always positive.
    pub amount: Decimal,
    /// Optional note.
    #[serde(default)]
    pub note: Option<String>,
}

/// Request body for recording actuals.
#[derive(Debug, Deserialize)]
pub struct RecordActualsRequest {
    /// Entries to record.
    pub entries: Vec<ActualRequest>,
}

/// Query parameters for listing actuals.
#[derive(Debug, Deserialize)]
pub struct ListActualsQuery {
    /// Only this month.
    #[serde(default)]
    pub month: Option<ProjectMonth>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /scenarios/{id}/actuals
async fn list_actuals(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ListActualsQuery>,
) -> impl IntoResponse {
    let repo = ActualRepository::new((*state.db).clone());
    match repo.list(id, query.month).await {
        Ok(actuals) => (StatusCode::OK, Json(json!({ "actuals": actuals }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /scenarios/{id}/actuals
async fn record_actuals(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordActualsRequest>,
) -> impl IntoResponse {
    if request.entries.is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "empty_entries",
            "At least one entry is required",
        );
    }

    let entries: Vec<NewActual> = request
        .entries
        .into_iter()
        .map(|e| NewActual {
            month: e.month,
            line: e.line,
            amount: e.amount,
            note: e.note,
        })
        .collect();

    let repo = ActualRepository::new((*state.db).clone());
    match repo.record_many(id, entries).await {
        Ok(created) => {
            info!(scenario_id = %id, count = created.len(), "Actuals recorded");
            (StatusCode::CREATED, Json(json!({ "actuals": created }))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /scenarios/{id}/actuals/{actual_id}
async fn delete_actual(
    State(state): State<AppState>,
    Path((id, actual_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let repo = ActualRepository::new((*state.db).clone());
    match repo.delete(id, actual_id).await {
        Ok(()) => {
            info!(scenario_id = %id, actual_id = %actual_id, "Actual deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimiento_core::projection::CostCategory;

    #[test]
    fn test_actual_line_keys() {
        let request: RecordActualsRequest = serde_json::from_str(
            r#"{"entries": [
                {"month": 3, "line": "cost:construction", "amount": "52000"},
                {"month": 3, "line": "sales_down_payment", "amount": "18000", "note": "Two reservations"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            request.entries[0].line,
            CashFlowLine::Cost(CostCategory::Construction)
        );
        assert_eq!(request.entries[1].line, CashFlowLine::SalesDownPayment);

        let bad = serde_json::from_str::<ActualRequest>(
            r#"{"month": 1, "line": "cost:unknown", "amount": "1"}"#,
        );
        assert!(bad.is_err());
    }
}
