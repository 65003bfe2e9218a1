//! Sales unit routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{error_response, json_error},
    routes::scenarios::deserialize_some,
};
use cimiento_core::projection::{ProjectMonth, UnitStatus};
use cimiento_db::repositories::{NewSalesUnit, SalesUnitRepository, UpdateSalesUnit};
use cimiento_shared::types::ScenarioProjectId;

/// Creates the unit routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/scenarios/{id}/units", get(list_units).post(create_units))
        .route(
            "/scenarios/{id}/units/{unit_id}",
            put(update_unit).delete(delete_unit),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// One unit in a create request.
#[derive(Debug, Deserialize)]
pub struct UnitRequest {
    /// Unit code, unique within the scenario.
    pub code: String,
    /// Typology.
    #[serde(default)]
    pub typology: Option<String>,
    /// Sellable area.
    #[serde(default)]
    pub area_m2: Decimal,
    /// List price.
    pub list_price: Decimal,
    /// Discount in percent.
    #[serde(default)]
    pub discount_pct: Decimal,
    /// Commercial status.
    #[serde(default = "default_status")]
    pub status: UnitStatus,
    /// Fixed sale month.
    #[serde(default)]
    pub sale_month: Option<ProjectMonth>,
    /// Fixed delivery month.
    #[serde(default)]
    pub delivery_month: Option<ProjectMonth>,
    /// Down payment in percent.
    #[serde(default)]
    pub down_payment_pct: Decimal,
    /// Down payment installments.
    #[serde(default = "default_installments")]
    pub down_payment_installments: u32,
}

const fn default_status() -> UnitStatus {
    UnitStatus::Available
}

const fn default_installments() -> u32 {
    1
}

impl From<UnitRequest> for NewSalesUnit {
    fn from(r: UnitRequest) -> Self {
        Self {
            code: r.code,
            typology: r.typology,
            area_m2: r.area_m2,
            list_price: r.list_price,
            discount_pct: r.discount_pct,
            status: r.status,
            sale_month: r.sale_month,
            delivery_month: r.delivery_month,
            down_payment_pct: r.down_payment_pct,
            down_payment_installments: r.down_payment_installments,
        }
    }
}

/// Request body for adding units.
#[derive(Debug, Deserialize)]
pub struct CreateUnitsRequest {
    /// Units to add.
    pub units: Vec<UnitRequest>,
}

/// Request body for a commercial update.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUnitRequest {
    /// New status.
    pub status: Option<UnitStatus>,
    /// New sale month; `null` returns the unit to the absorption pace.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub sale_month: Option<Option<ProjectMonth>>,
    /// New delivery month; `null` uses the scenario default.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub delivery_month: Option<Option<ProjectMonth>>,
    /// New list price.
    pub list_price: Option<Decimal>,
    /// New discount.
    pub discount_pct: Option<Decimal>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /scenarios/{id}/units
async fn list_units(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let repo = SalesUnitRepository::new((*state.db).clone());
    match repo.list(id).await {
        Ok(units) => (StatusCode::OK, Json(json!({ "units": units }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /scenarios/{id}/units
async fn create_units(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateUnitsRequest>,
) -> impl IntoResponse {
    if request.units.is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "empty_units",
            "At least one unit is required",
        );
    }

    let units: Vec<NewSalesUnit> = request.units.into_iter().map(NewSalesUnit::from).collect();
    let repo = SalesUnitRepository::new((*state.db).clone());
    match repo.create_many(id, units).await {
        Ok(created) => {
            info!(scenario_id = %id, count = created.len(), "Units created");
            state.cache.invalidate_project(ScenarioProjectId::from_uuid(id));
            (StatusCode::CREATED, Json(json!({ "units": created }))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// PUT /scenarios/{id}/units/{unit_id}
async fn update_unit(
    State(state): State<AppState>,
    Path((id, unit_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateUnitRequest>,
) -> impl IntoResponse {
    let input = UpdateSalesUnit {
        status: request.status,
        sale_month: request.sale_month,
        delivery_month: request.delivery_month,
        list_price: request.list_price,
        discount_pct: request.discount_pct,
    };

    let repo = SalesUnitRepository::new((*state.db).clone());
    match repo.update(id, unit_id, input).await {
        Ok(unit) => {
            info!(scenario_id = %id, unit_id = %unit_id, code = %unit.code, "Unit updated");
            state.cache.invalidate_project(ScenarioProjectId::from_uuid(id));
            (StatusCode::OK, Json(unit)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /scenarios/{id}/units/{unit_id}
async fn delete_unit(
    State(state): State<AppState>,
    Path((id, unit_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let repo = SalesUnitRepository::new((*state.db).clone());
    match repo.delete(id, unit_id).await {
        Ok(()) => {
            info!(scenario_id = %id, unit_id = %unit_id, "Unit deleted");
            state.cache.invalidate_project(ScenarioProjectId::from_uuid(id));
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}
