//! Cost item repository.

use chrono::Utc;
use cimiento_core::projection::{self as engine, CostItem, ProjectMonth, ProjectionError};
use cimiento_shared::AppError;
use cimiento_shared::types::CostItemId;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::guard::{EditCheck, EditScope, bump_revision, check_editable};
use crate::convert::{self, ConvertError, distribution_to_db, from_month};
use crate::entities::{scenario_cost_items, sea_orm_active_enums::ScenarioStatus};

/// Error types for cost item operations.
#[derive(Debug, thiserror::Error)]
pub enum CostItemError {
    /// Scenario not found.
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(Uuid),

    /// Cost item not found.
    #[error("Cost item not found: {0}")]
    NotFound(Uuid),

    /// Scenario status forbids the change.
    #[error("Scenario is {0:?}; cost items cannot be modified")]
    Locked(ScenarioStatus),

    /// Item failed validation.
    #[error(transparent)]
    Invalid(#[from] ProjectionError),

    /// Stored data could not be read back.
    #[error("Corrupt cost item: {0}")]
    Corrupt(#[from] ConvertError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CostItemError> for AppError {
    fn from(e: CostItemError) -> Self {
        match e {
            CostItemError::ScenarioNotFound(_) | CostItemError::NotFound(_) => {
                Self::NotFound(e.to_string())
            }
            CostItemError::Locked(_) => Self::Conflict(e.to_string()),
            CostItemError::Invalid(_) => Self::Validation(e.to_string()),
            CostItemError::Corrupt(_) => Self::Internal(e.to_string()),
            CostItemError::Database(_) => Self::Database(e.to_string()),
        }
    }
}

/// Input for a new cost item.
#[derive(Debug, Clone)]
pub struct NewCostItem {
    /// Cost category.
    pub category: engine::CostCategory,
    /// Free-text description.
    pub description: String,
    /// Total amount.
    pub amount: Decimal,
    /// First month.
    pub start_month: ProjectMonth,
    /// Months for uniform and S-curve spreading.
    pub duration_months: u32,
    /// Spreading rule.
    pub distribution: engine::Distribution,
}

impl NewCostItem {
    fn to_engine(&self, id: CostItemId) -> CostItem {
        CostItem {
            id,
            category: self.category,
            description: self.description.clone(),
            amount: self.amount,
            start_month: self.start_month,
            duration_months: self.duration_months,
            distribution: self.distribution.clone(),
        }
    }
}

/// Cost item repository.
#[derive(Debug, Clone)]
pub struct CostItemRepository {
    db: DatabaseConnection,
}

impl CostItemRepository {
    /// Creates a new cost item repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Adds cost items to a draft scenario in one transaction.
    ///
    /// Either all items are stored or none are.
    pub async fn create_many(
        &self,
        scenario_id: Uuid,
        items: Vec<NewCostItem>,
    ) -> Result<Vec<scenario_cost_items::Model>, CostItemError> {
        let validated: Vec<CostItem> = items
            .iter()
            .map(|item| {
                let engine_item = item.to_engine(CostItemId::new());
                engine_item.validate().map(|()| engine_item)
            })
            .collect::<Result<_, _>>()?;

        let txn = self.db.begin().await?;
        let scenario = match check_editable(&txn, scenario_id, EditScope::Structure).await? {
            EditCheck::Editable(s) => *s,
            EditCheck::NotFound => return Err(CostItemError::ScenarioNotFound(scenario_id)),
            EditCheck::Locked(status) => return Err(CostItemError::Locked(status)),
        };

        let existing = scenario_cost_items::Entity::find()
            .filter(scenario_cost_items::Column::ScenarioId.eq(scenario_id))
            .all(&txn)
            .await?
            .len();

        let now = Utc::now();
        let mut created = Vec::with_capacity(validated.len());
        for (offset, item) in validated.into_iter().enumerate() {
            let (distribution, custom_percentages) = distribution_to_db(&item.distribution);
            let sort_order = i32::try_from(existing + offset).unwrap_or(i32::MAX);
            let model = scenario_cost_items::ActiveModel {
                id: Set(item.id.into_inner()),
                scenario_id: Set(scenario_id),
                category: Set(item.category.into()),
                description: Set(item.description),
                amount: Set(item.amount),
                start_month: Set(from_month(item.start_month)),
                duration_months: Set(from_month(item.duration_months)),
                distribution: Set(distribution),
                custom_percentages: Set(custom_percentages),
                sort_order: Set(sort_order),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;
            created.push(model);
        }

        if !created.is_empty() {
            bump_revision(&txn, scenario).await?;
        }
        txn.commit().await?;
        Ok(created)
    }

    /// Lists a scenario's cost items in entry order.
    pub async fn list(
        &self,
        scenario_id: Uuid,
    ) -> Result<Vec<scenario_cost_items::Model>, CostItemError> {
        Ok(scenario_cost_items::Entity::find()
            .filter(scenario_cost_items::Column::ScenarioId.eq(scenario_id))
            .order_by_asc(scenario_cost_items::Column::SortOrder)
            .order_by_asc(scenario_cost_items::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Replaces a cost item's definition.
    pub async fn update(
        &self,
        scenario_id: Uuid,
        item_id: Uuid,
        input: NewCostItem,
    ) -> Result<scenario_cost_items::Model, CostItemError> {
        input.to_engine(CostItemId::from_uuid(item_id)).validate()?;

        let txn = self.db.begin().await?;
        let scenario = match check_editable(&txn, scenario_id, EditScope::Structure).await? {
            EditCheck::Editable(s) => *s,
            EditCheck::NotFound => return Err(CostItemError::ScenarioNotFound(scenario_id)),
            EditCheck::Locked(status) => return Err(CostItemError::Locked(status)),
        };

        let existing = scenario_cost_items::Entity::find_by_id(item_id)
            .filter(scenario_cost_items::Column::ScenarioId.eq(scenario_id))
            .one(&txn)
            .await?
            .ok_or(CostItemError::NotFound(item_id))?;

        let (distribution, custom_percentages) = distribution_to_db(&input.distribution);
        let mut active: scenario_cost_items::ActiveModel = existing.into();
        active.category = Set(input.category.into());
        active.description = Set(input.description);
        active.amount = Set(input.amount);
        active.start_month = Set(from_month(input.start_month));
        active.duration_months = Set(from_month(input.duration_months));
        active.distribution = Set(distribution);
        active.custom_percentages = Set(custom_percentages);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await?;

        bump_revision(&txn, scenario).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Removes a cost item from a draft scenario.
    pub async fn delete(&self, scenario_id: Uuid, item_id: Uuid) -> Result<(), CostItemError> {
        let txn = self.db.begin().await?;
        let scenario = match check_editable(&txn, scenario_id, EditScope::Structure).await? {
            EditCheck::Editable(s) => *s,
            EditCheck::NotFound => return Err(CostItemError::ScenarioNotFound(scenario_id)),
            EditCheck::Locked(status) => return Err(CostItemError::Locked(status)),
        };

        let existing = scenario_cost_items::Entity::find_by_id(item_id)
            .filter(scenario_cost_items::Column::ScenarioId.eq(scenario_id))
            .one(&txn)
            .await?
            .ok_or(CostItemError::NotFound(item_id))?;
        existing.delete(&txn).await?;

        bump_revision(&txn, scenario).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Loads a scenario's cost items as engine types.
    pub async fn load(&self, scenario_id: Uuid) -> Result<Vec<CostItem>, CostItemError> {
        self.list(scenario_id)
            .await?
            .iter()
            .map(|m| convert::cost_item(m).map_err(CostItemError::from))
            .collect()
    }
}
