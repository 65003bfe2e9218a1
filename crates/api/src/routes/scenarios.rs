//! Scenario routes: lifecycle and metadata.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::projections::project;
use crate::{
    AppState,
    error::{error_response, json_error},
};
use cimiento_core::projection::SalesAssumptions;
use cimiento_db::entities::{scenario_projects, sea_orm_active_enums::ScenarioStatus};
use cimiento_db::repositories::{
    CreateScenarioInput, ProjectionRepository, ScenarioFilter, ScenarioRepository,
    UpdateScenarioInput,
};
use cimiento_shared::types::{Currency, PageRequest, ScenarioProjectId};

/// Creates the scenario routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/scenarios", get(list_scenarios).post(create_scenario))
        .route(
            "/scenarios/{id}",
            get(get_scenario).put(update_scenario).delete(delete_scenario),
        )
        .route("/scenarios/{id}/approve", post(approve_scenario))
        .route("/scenarios/{id}/archive", post(archive_scenario))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing scenarios.
#[derive(Debug, Deserialize)]
pub struct ListScenariosQuery {
    /// Page number (1-indexed).
    #[serde(default)]
    pub page: Option<u32>,
    /// Items per page.
    #[serde(default)]
    pub per_page: Option<u32>,
    /// Filter by status.
    #[serde(default)]
    pub status: Option<ScenarioStatus>,
}

/// Request body for creating a scenario.
#[derive(Debug, Deserialize)]
pub struct CreateScenarioRequest {
    /// Scenario name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Reporting currency, USD when absent.
    #[serde(default)]
    pub currency: Option<Currency>,
    /// Project start date.
    pub start_date: NaiveDate,
    /// Planned duration in months.
    pub duration_months: u32,
    /// Annual discount rate; the configured default when absent.
    #[serde(default)]
    pub discount_rate: Option<Decimal>,
    /// First month units go on sale.
    #[serde(default)]
    pub sales_start_month: u32,
    /// Units sold per month.
    #[serde(default = "default_absorption")]
    pub absorption_per_month: u32,
    /// Default delivery month; the last planned month when absent.
    #[serde(default)]
    pub default_delivery_month: Option<u32>,
    /// Monthly price escalation for paced units.
    #[serde(default)]
    pub monthly_price_escalation: Decimal,
}

fn default_absorption() -> u32 {
    1
}

/// Request body for updating a scenario.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateScenarioRequest {
    /// New name.
    pub name: Option<String>,
    /// New description; `null` clears it.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    /// New currency.
    pub currency: Option<Currency>,
    /// New start date.
    pub start_date: Option<NaiveDate>,
    /// New duration.
    pub duration_months: Option<u32>,
    /// New discount rate.
    pub discount_rate: Option<Decimal>,
    /// New sales start month.
    pub sales_start_month: Option<u32>,
    /// New absorption pace.
    pub absorption_per_month: Option<u32>,
    /// New default delivery month.
    pub default_delivery_month: Option<u32>,
    /// New monthly price escalation.
    pub monthly_price_escalation: Option<Decimal>,
}

/// Distinguishes an explicit `null` from an absent field.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Query parameters for approving a scenario.
#[derive(Debug, Default, Deserialize)]
pub struct ApproveScenarioQuery {
    /// Revision the client reviewed; approval fails if the scenario moved on.
    #[serde(default)]
    pub expected_revision: Option<i64>,
}

/// Scenario response.
#[derive(Debug, Serialize)]
pub struct ScenarioResponse {
    /// Scenario ID.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Currency code.
    pub currency: String,
    /// Start date.
    pub start_date: NaiveDate,
    /// Planned duration.
    pub duration_months: i32,
    /// Annual discount rate.
    pub discount_rate: Decimal,
    /// First sales month.
    pub sales_start_month: i32,
    /// Units sold per month.
    pub absorption_per_month: i32,
    /// Default delivery month.
    pub default_delivery_month: i32,
    /// Monthly price escalation.
    pub monthly_price_escalation: Decimal,
    /// Lifecycle status.
    pub status: ScenarioStatus,
    /// Revision, bumped on every change that affects the projection.
    pub revision: i64,
    /// Approval time.
    pub approved_at: Option<DateTime<FixedOffset>>,
    /// Creation time.
    pub created_at: DateTime<FixedOffset>,
    /// Last update time.
    pub updated_at: DateTime<FixedOffset>,
}

impl From<scenario_projects::Model> for ScenarioResponse {
    fn from(m: scenario_projects::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            currency: m.currency,
            start_date: m.start_date,
            duration_months: m.duration_months,
            discount_rate: m.discount_rate,
            sales_start_month: m.sales_start_month,
            absorption_per_month: m.absorption_per_month,
            default_delivery_month: m.default_delivery_month,
            monthly_price_escalation: m.monthly_price_escalation,
            status: m.status,
            revision: m.revision,
            approved_at: m.approved_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /scenarios
async fn list_scenarios(
    State(state): State<AppState>,
    Query(query): Query<ListScenariosQuery>,
) -> impl IntoResponse {
    let defaults = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };
    let filter = ScenarioFilter {
        status: query.status,
    };

    let repo = ScenarioRepository::new((*state.db).clone());
    match repo.list(&filter, &page).await {
        Ok(result) => (
            StatusCode::OK,
            Json(result.map(ScenarioResponse::from)),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /scenarios
async fn create_scenario(
    State(state): State<AppState>,
    Json(request): Json<CreateScenarioRequest>,
) -> impl IntoResponse {
    if request.name.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "invalid_name", "Name cannot be empty");
    }
    if request.duration_months == 0 {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_duration",
            "Duration must be at least one month",
        );
    }
    if request.duration_months > state.options.max_horizon_months {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_duration",
            format!(
                "Duration cannot exceed {} months",
                state.options.max_horizon_months
            ),
        );
    }

    let discount_rate = request.discount_rate.unwrap_or(state.default_discount_rate);
    if discount_rate < Decimal::ZERO || discount_rate > Decimal::ONE {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_discount_rate",
            "Discount rate must be between 0 and 1",
        );
    }

    let input = CreateScenarioInput {
        name: request.name,
        description: request.description,
        currency: request.currency.unwrap_or_default(),
        start_date: request.start_date,
        duration_months: request.duration_months,
        discount_rate,
        sales: SalesAssumptions {
            sales_start_month: request.sales_start_month,
            absorption_per_month: request.absorption_per_month,
            default_delivery_month: request
                .default_delivery_month
                .unwrap_or(request.duration_months - 1),
            monthly_price_escalation: request.monthly_price_escalation,
        },
    };

    let repo = ScenarioRepository::new((*state.db).clone());
    match repo.create(input).await {
        Ok(scenario) => {
            info!(scenario_id = %scenario.id, name = %scenario.name, "Scenario created");
            (StatusCode::CREATED, Json(ScenarioResponse::from(scenario))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET /scenarios/{id}
async fn get_scenario(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let repo = ScenarioRepository::new((*state.db).clone());
    match repo.get(id).await {
        Ok(scenario) => (StatusCode::OK, Json(ScenarioResponse::from(scenario))).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT /scenarios/{id}
async fn update_scenario(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateScenarioRequest>,
) -> impl IntoResponse {
    let input = UpdateScenarioInput {
        name: request.name,
        description: request.description,
        currency: request.currency,
        start_date: request.start_date,
        duration_months: request.duration_months,
        discount_rate: request.discount_rate,
        sales_start_month: request.sales_start_month,
        absorption_per_month: request.absorption_per_month,
        default_delivery_month: request.default_delivery_month,
        monthly_price_escalation: request.monthly_price_escalation,
    };

    let repo = ScenarioRepository::new((*state.db).clone());
    match repo.update(id, input).await {
        Ok(scenario) => {
            info!(scenario_id = %id, revision = scenario.revision, "Scenario updated");
            state.cache.invalidate_project(ScenarioProjectId::from_uuid(id));
            (StatusCode::OK, Json(ScenarioResponse::from(scenario))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /scenarios/{id}
async fn delete_scenario(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = ScenarioRepository::new((*state.db).clone());
    match repo.delete(id).await {
        Ok(()) => {
            info!(scenario_id = %id, "Scenario deleted");
            state.cache.invalidate_project(ScenarioProjectId::from_uuid(id));
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /scenarios/{id}/approve?expected_revision=N
///
/// Projects the current revision and stores its monthly cash flow as the
/// approved baseline.
async fn approve_scenario(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(request): Query<ApproveScenarioQuery>,
) -> impl IntoResponse {
    let loaded = match ProjectionRepository::new((*state.db).clone())
        .load_input(id)
        .await
    {
        Ok(loaded) => loaded,
        Err(e) => return error_response(e),
    };

    if let Some(expected) = request.expected_revision {
        if expected != loaded.revision {
            warn!(scenario_id = %id, expected, actual = loaded.revision, "Stale approval");
            return json_error(
                StatusCode::CONFLICT,
                "stale_revision",
                format!(
                    "Scenario is at revision {}, approval requested for {expected}",
                    loaded.revision
                ),
            );
        }
    }

    let result = match project(&state, &loaded, None).await {
        Ok(result) => result,
        Err(response) => return response,
    };

    let repo = ScenarioRepository::new((*state.db).clone());
    match repo.approve(id, loaded.revision, &result.monthly).await {
        Ok(scenario) => {
            info!(
                scenario_id = %id,
                revision = scenario.revision,
                baseline_months = result.monthly.len(),
                "Scenario approved"
            );
            (StatusCode::OK, Json(ScenarioResponse::from(scenario))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /scenarios/{id}/archive
async fn archive_scenario(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = ScenarioRepository::new((*state.db).clone());
    match repo.archive(id).await {
        Ok(scenario) => {
            info!(scenario_id = %id, "Scenario archived");
            (StatusCode::OK, Json(ScenarioResponse::from(scenario))).into_response()
        }
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_description() {
        let cleared: UpdateScenarioRequest =
            serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let absent: UpdateScenarioRequest = serde_json::from_str(r#"{"name": "B"}"#).unwrap();
        assert_eq!(absent.description, None);
        assert_eq!(absent.name.as_deref(), Some("B"));
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateScenarioRequest = serde_json::from_str(
            r#"{"name":"Torre","start_date":"2026-03-01","duration_months":24}"#,
        )
        .unwrap();
        assert_eq!(request.absorption_per_month, 1);
        assert_eq!(request.sales_start_month, 0);
        assert!(request.currency.is_none());
        assert!(request.default_delivery_month.is_none());
    }
}
