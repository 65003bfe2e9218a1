//! Cost item routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{error_response, json_error},
};
use cimiento_core::projection::{CostCategory, Distribution, ProjectMonth};
use cimiento_db::entities::{
    scenario_cost_items,
    sea_orm_active_enums::{CostCategory as DbCostCategory, CostDistribution},
};
use cimiento_db::repositories::{CostItemRepository, NewCostItem};
use cimiento_shared::types::{ScenarioProjectId, cents, round_money};

/// Creates the cost item routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/scenarios/{id}/cost-items",
            get(list_cost_items).post(create_cost_items),
        )
        .route(
            "/scenarios/{id}/cost-items/{item_id}",
            put(update_cost_item).delete(delete_cost_item),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// One cost item in a request.
#[derive(Debug, Deserialize)]
pub struct CostItemRequest {
    /// Cost category.
    pub category: CostCategory,
    /// Free-text description.
    pub description: String,
    /// Total amount.
    pub amount: Decimal,
    /// First month.
    #[serde(default)]
    pub start_month: ProjectMonth,
    /// Months for uniform and S-curve spreading.
    #[serde(default = "default_duration")]
    pub duration_months: u32,
    /// Spreading rule, e.g. `{"method": "s_curve"}`.
    pub distribution: Distribution,
}

fn default_duration() -> u32 {
    1
}

impl From<CostItemRequest> for NewCostItem {
    fn from(r: CostItemRequest) -> Self {
        Self {
            category: r.category,
            description: r.description,
            amount: r.amount,
            start_month: r.start_month,
            duration_months: r.duration_months,
            distribution: r.distribution,
        }
    }
}

/// Request body for adding cost items.
#[derive(Debug, Deserialize)]
pub struct CreateCostItemsRequest {
    /// Items to add.
    pub items: Vec<CostItemRequest>,
}

/// Cost item response.
#[derive(Debug, Serialize)]
pub struct CostItemResponse {
    /// Item ID.
    pub id: Uuid,
    /// Category.
    pub category: DbCostCategory,
    /// Description.
    pub description: String,
    /// Total amount.
    #[serde(serialize_with = "cents::serialize")]
    pub amount: Decimal,
    /// First month.
    pub start_month: i32,
    /// Spread duration.
    pub duration_months: i32,
    /// Spreading rule.
    pub distribution: CostDistribution,
    /// Percentages of a custom distribution.
    pub custom_percentages: Option<serde_json::Value>,
}

impl From<scenario_cost_items::Model> for CostItemResponse {
    fn from(m: scenario_cost_items::Model) -> Self {
        Self {
            id: m.id,
            category: m.category,
            description: m.description,
            amount: m.amount,
            start_month: m.start_month,
            duration_months: m.duration_months,
            distribution: m.distribution,
            custom_percentages: m.custom_percentages,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /scenarios/{id}/cost-items
async fn list_cost_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = CostItemRepository::new((*state.db).clone());
    match repo.list(id).await {
        Ok(items) => {
            let total = round_money(items.iter().map(|i| i.amount).sum());
            let items: Vec<CostItemResponse> =
                items.into_iter().map(CostItemResponse::from).collect();
            (
                StatusCode::OK,
                Json(json!({ "items": items, "total": total })),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /scenarios/{id}/cost-items
async fn create_cost_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateCostItemsRequest>,
) -> impl IntoResponse {
    if request.items.is_empty() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "empty_items",
            "At least one cost item is required",
        );
    }

    let items: Vec<NewCostItem> = request.items.into_iter().map(NewCostItem::from).collect();
    let repo = CostItemRepository::new((*state.db).clone());
    match repo.create_many(id, items).await {
        Ok(created) => {
            info!(scenario_id = %id, count = created.len(), "Cost items created");
            state.cache.invalidate_project(ScenarioProjectId::from_uuid(id));
            let items: Vec<CostItemResponse> =
                created.into_iter().map(CostItemResponse::from).collect();
            (StatusCode::CREATED, Json(json!({ "items": items }))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// PUT /scenarios/{id}/cost-items/{item_id}
async fn update_cost_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CostItemRequest>,
) -> impl IntoResponse {
    let repo = CostItemRepository::new((*state.db).clone());
    match repo.update(id, item_id, request.into()).await {
        Ok(item) => {
            info!(scenario_id = %id, item_id = %item_id, "Cost item updated");
            state.cache.invalidate_project(ScenarioProjectId::from_uuid(id));
            (StatusCode::OK, Json(CostItemResponse::from(item))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE /scenarios/{id}/cost-items/{item_id}
async fn delete_cost_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let repo = CostItemRepository::new((*state.db).clone());
    match repo.delete(id, item_id).await {
        Ok(()) => {
            info!(scenario_id = %id, item_id = %item_id, "Cost item deleted");
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
    fn test_cost_item_request_parsing() {
        let request: CostItemRequest = serde_json::from_str(
            r#"{
                "category": "construction",
                "description": "Structure",
                "amount": "600000",
                "start_month": 1,
                "duration_months": 10,
                "distribution": {"method": "s_curve"}
            }"#,
        )
        .unwrap();
        assert_eq!(request.category, CostCategory::Construction);
        assert_eq!(request.distribution, Distribution::SCurve);
        assert_eq!(request.amount, dec!(600000));

        let custom: CostItemRequest = serde_json::from_str(
            r#"{
                "category": "soft_costs",
                "description": "Design",
                "amount": "1000",
                "distribution": {"method": "custom", "percentages": ["60", "40"]}
            }"#,
        )
        .unwrap();
        assert_eq!(custom.duration_months, 1);
        assert_eq!(
            custom.distribution,
            Distribution::Custom(vec![dec!(60), dec!(40)])
        );
    }
}
