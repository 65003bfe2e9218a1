//! Projection routes: cash flow, metrics, plan-vs-actual, sensitivity, and
//! side-by-side scenario comparison.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    AppState,
    error::{error_response, json_error, projection_error_response},
};
use cimiento_core::projection::{
    BaselineSource, FinancialMetrics, ProjectionResult, Variant, compare, run_sensitivity,
};
use cimiento_db::repositories::{LoadedScenario, ProjectionRepository};
use cimiento_shared::AppError;
use cimiento_shared::types::{Currency, Money};

/// Most variants accepted by one sensitivity request.
const MAX_VARIANTS: usize = 20;

/// Most scenarios compared side by side.
const MAX_COMPARED: usize = 10;

/// Creates the projection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/scenarios/{id}/cash-flow", get(get_cash_flow))
        .route("/scenarios/{id}/metrics", get(get_metrics))
        .route("/scenarios/{id}/comparison", get(get_comparison))
        .route("/scenarios/{id}/sensitivity", post(run_sensitivity_analysis))
        .route("/scenarios/compare", post(compare_scenarios))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters shared by projection endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectionQuery {
    /// Replaces the scenario's annual discount rate.
    #[serde(default)]
    pub discount_rate: Option<Decimal>,
}

/// Request body for a sensitivity run.
#[derive(Debug, Deserialize)]
pub struct SensitivityRequest {
    /// Named variants to run against the base case.
    pub variants: Vec<Variant>,
    /// Replaces the scenario's annual discount rate.
    #[serde(default)]
    pub discount_rate: Option<Decimal>,
}

/// Request body for comparing scenarios.
#[derive(Debug, Deserialize)]
pub struct CompareScenariosRequest {
    /// Scenarios to compare.
    pub scenario_ids: Vec<Uuid>,
    /// Common annual discount rate for all of them.
    #[serde(default)]
    pub discount_rate: Option<Decimal>,
}

/// One scenario in a side-by-side comparison.
#[derive(Debug, Serialize)]
pub struct ScenarioSummary {
    /// Scenario ID.
    pub scenario_id: Uuid,
    /// Scenario name.
    pub name: String,
    /// Revision projected.
    pub revision: i64,
    /// Reporting currency.
    pub currency: Currency,
    /// Projected horizon.
    pub horizon_months: Option<u32>,
    /// Total sales revenue.
    pub total_revenue: Option<Money>,
    /// Total development cost.
    pub total_cost: Option<Money>,
    /// Largest cumulative equity need.
    pub peak_funding: Option<Money>,
    /// Unleveraged metrics.
    pub project: Option<FinancialMetrics>,
    /// Leveraged metrics.
    pub equity: Option<FinancialMetrics>,
    /// Projection error, when the scenario could not be projected.
    pub error: Option<String>,
}

impl ScenarioSummary {
    fn new(loaded: &LoadedScenario, result: Result<ProjectionResult, String>) -> Self {
        let currency = loaded.input.currency;
        let base = Self {
            scenario_id: loaded.input.project_id.into_inner(),
            name: loaded.input.name.clone(),
            revision: loaded.revision,
            currency,
            horizon_months: None,
            total_revenue: None,
            total_cost: None,
            peak_funding: None,
            project: None,
            equity: None,
            error: None,
        };

        match result {
            Ok(result) => {
                let metrics = result.metrics;
                Self {
                    horizon_months: Some(result.horizon_months),
                    total_revenue: Some(Money::new(metrics.project.total_revenue, currency)),
                    total_cost: Some(Money::new(metrics.project.total_cost, currency)),
                    peak_funding: Some(Money::new(metrics.equity.peak_funding, currency)),
                    project: Some(metrics.project),
                    equity: Some(metrics.equity),
                    ..base
                }
            }
            Err(message) => Self {
                error: Some(message),
                ..base
            },
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

async fn load(state: &AppState, id: Uuid) -> Result<LoadedScenario, Response> {
    ProjectionRepository::new((*state.db).clone())
        .load_input(id)
        .await
        .map_err(error_response)
}

/// Projects a loaded scenario through the cache on the blocking pool.
pub(crate) async fn project(
    state: &AppState,
    loaded: &LoadedScenario,
    discount_rate: Option<Decimal>,
) -> Result<ProjectionResult, Response> {
    let options = state.options_with(discount_rate);
    let cache = state.cache.clone();
    let input = loaded.input.clone();
    let revision = loaded.revision;

    let outcome =
        tokio::task::spawn_blocking(move || cache.run_cached(&input, &options, revision)).await;

    match outcome.map_err(|e| join_error(&e))? {
        Ok(result) => {
            debug!(
                scenario_id = %loaded.input.project_id,
                revision = loaded.revision,
                horizon = result.horizon_months,
                cached = result.cached,
                equity_npv = %result.metrics.equity.npv,
                "Projection computed"
            );
            for warning in &result.warnings {
                warn!(scenario_id = %loaded.input.project_id, warning = %warning, "Projection warning");
            }
            Ok(result)
        }
        Err(e) => {
            debug!(scenario_id = %loaded.input.project_id, error = %e, "Projection rejected");
            Err(projection_error_response(&e))
        }
    }
}

fn join_error(e: &tokio::task::JoinError) -> Response {
    error!(error = %e, "Projection task failed");
    error_response(AppError::Internal("Projection task failed".to_string()))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /scenarios/{id}/cash-flow
async fn get_cash_flow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ProjectionQuery>,
) -> Response {
    let loaded = match load(&state, id).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };
    let result = match project(&state, &loaded, query.discount_rate).await {
        Ok(result) => result,
        Err(response) => return response,
    };

    (
        StatusCode::OK,
        Json(json!({
            "projection_id": result.projection_id,
            "scenario_id": id,
            "revision": loaded.revision,
            "name": result.name,
            "currency": result.currency,
            "start_date": result.start_date,
            "horizon_months": result.horizon_months,
            "monthly": result.monthly,
            "cost_totals": result.cost_totals,
            "credit": result.credit,
            "units": result.units,
            "warnings": result.warnings,
            "parameters_hash": result.parameters_hash,
            "cached": result.cached,
        })),
    )
        .into_response()
}

/// GET /scenarios/{id}/metrics
async fn get_metrics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ProjectionQuery>,
) -> Response {
    let loaded = match load(&state, id).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };
    let result = match project(&state, &loaded, query.discount_rate).await {
        Ok(result) => result,
        Err(response) => return response,
    };

    (
        StatusCode::OK,
        Json(json!({
            "scenario_id": id,
            "revision": loaded.revision,
            "currency": result.currency,
            "horizon_months": result.horizon_months,
            "metrics": result.metrics,
            "warnings": result.warnings,
            "parameters_hash": result.parameters_hash,
            "cached": result.cached,
        })),
    )
        .into_response()
}

/// GET /scenarios/{id}/comparison
///
/// Compares actuals against the approved baseline, or against the current
/// projection when the scenario was never approved.
async fn get_comparison(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ProjectionQuery>,
) -> Response {
    let data = match ProjectionRepository::new((*state.db).clone())
        .load_comparison(id)
        .await
    {
        Ok(data) => data,
        Err(e) => return error_response(e),
    };

    let start_date = data.scenario.input.start_date;
    let report = if let Some(baseline) = &data.baseline {
        compare(start_date, baseline, &data.actuals, BaselineSource::Approved)
    } else {
        let result = match project(&state, &data.scenario, query.discount_rate).await {
            Ok(result) => result,
            Err(response) => return response,
        };
        compare(
            start_date,
            &result.monthly,
            &data.actuals,
            BaselineSource::CurrentProjection,
        )
    };

    debug!(
        scenario_id = %id,
        source = ?report.source,
        months_reported = report.totals.months_reported,
        "Comparison computed"
    );

    (
        StatusCode::OK,
        Json(json!({
            "scenario_id": id,
            "revision": data.scenario.revision,
            "currency": data.scenario.input.currency,
            "comparison": report,
        })),
    )
        .into_response()
}

/// POST /scenarios/{id}/sensitivity
async fn run_sensitivity_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SensitivityRequest>,
) -> Response {
    if request.variants.is_empty() || request.variants.len() > MAX_VARIANTS {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_variants",
            format!("Between 1 and {MAX_VARIANTS} variants are required"),
        );
    }

    let loaded = match load(&state, id).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };
    let options = state.options_with(request.discount_rate);
    let variants = request.variants;
    let input = loaded.input;

    let outcome =
        tokio::task::spawn_blocking(move || run_sensitivity(&input, &variants, &options)).await;

    match outcome {
        Ok(Ok(report)) => {
            debug!(
                scenario_id = %id,
                variants = report.variants.len(),
                failed = report.variants.iter().filter(|v| v.error.is_some()).count(),
                "Sensitivity computed"
            );
            (
                StatusCode::OK,
                Json(json!({
                    "scenario_id": id,
                    "revision": loaded.revision,
                    "sensitivity": report,
                })),
            )
                .into_response()
        }
        Ok(Err(e)) => projection_error_response(&e),
        Err(e) => join_error(&e),
    }
}

/// POST /scenarios/compare
async fn compare_scenarios(
    State(state): State<AppState>,
    Json(request): Json<CompareScenariosRequest>,
) -> Response {
    if request.scenario_ids.is_empty() || request.scenario_ids.len() > MAX_COMPARED {
        return json_error(
            StatusCode::BAD_REQUEST,
            "invalid_scenarios",
            format!("Between 1 and {MAX_COMPARED} scenarios are required"),
        );
    }

    let mut loaded = Vec::with_capacity(request.scenario_ids.len());
    for id in &request.scenario_ids {
        match load(&state, *id).await {
            Ok(scenario) => loaded.push(scenario),
            Err(response) => return response,
        }
    }

    let options = state.options_with(request.discount_rate);
    let cache = state.cache.clone();
    let inputs: Vec<_> = loaded
        .iter()
        .map(|l| (l.input.clone(), l.revision))
        .collect();

    let results =
        match tokio::task::spawn_blocking(move || cache.run_many_cached(&inputs, &options)).await {
            Ok(results) => results,
            Err(e) => return join_error(&e),
        };

    let summaries: Vec<ScenarioSummary> = loaded
        .iter()
        .zip(results)
        .map(|(scenario, result)| {
            ScenarioSummary::new(scenario, result.map_err(|e| e.to_string()))
        })
        .collect();

    debug!(count = summaries.len(), "Scenarios compared");
    (StatusCode::OK, Json(json!({ "scenarios": summaries }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cimiento_core::projection::{
        AdjustmentType, CostCategory, CostItem, Distribution, ProjectionCache, ProjectionInput,
        ProjectionOptions, SalesAssumptions, SensitivityTarget,
    };
    use cimiento_db::entities::sea_orm_active_enums::ScenarioStatus;
    use cimiento_shared::types::{CostItemId, ScenarioProjectId};
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;
    use sea_orm::DatabaseConnection;

    fn state() -> AppState {
        AppState::new(
            DatabaseConnection::Disconnected,
            ProjectionCache::new(),
            ProjectionOptions::default(),
            dec!(0.12),
        )
    }

    fn loaded(duration_months: u32) -> LoadedScenario {
        LoadedScenario {
            input: ProjectionInput {
                project_id: ScenarioProjectId::new(),
                name: "Lote Sur".to_string(),
                currency: Currency::Usd,
                start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                duration_months,
                discount_rate: dec!(0.10),
                costs: vec![CostItem {
                    id: CostItemId::new(),
                    category: CostCategory::Land,
                    description: "Lot".to_string(),
                    amount: dec!(50000),
                    start_month: 0,
                    duration_months: 1,
                    distribution: Distribution::Lump,
                }],
                credit_lines: vec![],
                units: vec![],
                sales: SalesAssumptions {
                    sales_start_month: 0,
                    absorption_per_month: 1,
                    default_delivery_month: duration_months.saturating_sub(1),
                    monthly_price_escalation: Decimal::ZERO,
                },
            },
            revision: 4,
            status: ScenarioStatus::Draft,
        }
    }

    #[tokio::test]
    async fn test_project_runs_off_the_async_worker_and_caches() {
        let state = state();
        let scenario = loaded(6);

        let first = project(&state, &scenario, None).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.horizon_months, 6);
        assert_eq!(first.metrics.project.total_cost, dec!(50000));

        let second = project(&state, &scenario, None).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.parameters_hash, first.parameters_hash);

        let overridden = project(&state, &scenario, Some(Decimal::ZERO)).await.unwrap();
        assert!(!overridden.cached);
        assert_eq!(overridden.metrics.discount_rate, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_project_maps_engine_errors() {
        let response = project(&state(), &loaded(0), None).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "validation_error");
    }

    #[test]
    fn test_sensitivity_request_parsing() {
        let request: SensitivityRequest = serde_json::from_str(
            r#"{
                "variants": [
                    {
                        "name": "Prices -10%",
                        "adjustments": [{
                            "target": {"kind": "sales_price"},
                            "adjustment_type": "percentage_decrease",
                            "value": "10"
                        }]
                    },
                    {
                        "name": "Construction +15%",
                        "adjustments": [{
                            "target": {"kind": "cost", "category": "construction"},
                            "adjustment_type": "percentage_increase",
                            "value": "15"
                        }]
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(request.variants.len(), 2);
        let first = &request.variants[0].adjustments[0];
        assert_eq!(first.target, SensitivityTarget::SalesPrice);
        assert_eq!(first.adjustment_type, AdjustmentType::PercentageDecrease);
        assert!(request.discount_rate.is_none());
    }
}
