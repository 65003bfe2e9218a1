//! Scenario repository: scenario lifecycle and approved baselines.

use chrono::{NaiveDate, Utc};
use cimiento_core::projection::{MonthlyCashFlow, SalesAssumptions};
use cimiento_shared::AppError;
use cimiento_shared::types::{Currency, PageRequest, PageResponse};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use super::guard::{EditCheck, EditScope, check_editable};
use crate::convert::{ConvertError, baseline_month, breakdown_to_json, from_month};
use crate::entities::{scenario_baselines, scenario_projects, sea_orm_active_enums::ScenarioStatus};

/// Error types for scenario operations.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Scenario not found.
    #[error("Scenario not found: {0}")]
    NotFound(Uuid),

    /// Scenario status forbids the change.
    #[error("Scenario {id} is {status:?} and cannot be modified")]
    Locked {
        /// Scenario ID.
        id: Uuid,
        /// Current status.
        status: ScenarioStatus,
    },

    /// Status change not allowed from the current status.
    #[error("Cannot move scenario from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current status.
        from: ScenarioStatus,
        /// Requested status.
        to: ScenarioStatus,
    },

    /// The scenario changed since the projection being approved was computed.
    #[error("Scenario revision is {actual}, projection was computed at {expected}")]
    StaleRevision {
        /// Revision the caller projected.
        expected: i64,
        /// Current revision.
        actual: i64,
    },

    /// Invalid input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Stored data could not be read back.
    #[error("Corrupt scenario data: {0}")]
    Corrupt(#[from] ConvertError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ScenarioError> for AppError {
    fn from(e: ScenarioError) -> Self {
        match e {
            ScenarioError::NotFound(_) => Self::NotFound(e.to_string()),
            ScenarioError::Locked { .. }
            | ScenarioError::InvalidTransition { .. }
            | ScenarioError::StaleRevision { .. } => Self::Conflict(e.to_string()),
            ScenarioError::Validation(msg) => Self::Validation(msg),
            ScenarioError::Corrupt(_) => Self::Internal(e.to_string()),
            ScenarioError::Database(_) => Self::Database(e.to_string()),
        }
    }
}

/// Input for creating a scenario.
#[derive(Debug, Clone)]
pub struct CreateScenarioInput {
    /// Scenario name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Reporting currency.
    pub currency: Currency,
    /// Project start date.
    pub start_date: NaiveDate,
    /// Planned duration in months.
    pub duration_months: u32,
    /// Annual discount rate.
    pub discount_rate: Decimal,
    /// Sales pace and pricing.
    pub sales: SalesAssumptions,
}

/// Input for updating a scenario. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateScenarioInput {
    /// New name.
    pub name: Option<String>,
    /// New description.
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

impl UpdateScenarioInput {
    /// Whether the update touches anything that feeds the projection.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        self.currency.is_some()
            || self.start_date.is_some()
            || self.duration_months.is_some()
            || self.discount_rate.is_some()
            || self.sales_start_month.is_some()
            || self.absorption_per_month.is_some()
            || self.default_delivery_month.is_some()
            || self.monthly_price_escalation.is_some()
    }
}

/// Optional list filter.
#[derive(Debug, Clone, Default)]
pub struct ScenarioFilter {
    /// Only scenarios in this status.
    pub status: Option<ScenarioStatus>,
}

fn validate_name(name: &str) -> Result<(), ScenarioError> {
    if name.trim().is_empty() {
        return Err(ScenarioError::Validation("name cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_duration(months: u32) -> Result<(), ScenarioError> {
    if months == 0 {
        return Err(ScenarioError::Validation(
            "duration_months must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_discount_rate(rate: Decimal) -> Result<(), ScenarioError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(ScenarioError::Validation(
            "discount_rate must be between 0 and 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_escalation(rate: Decimal) -> Result<(), ScenarioError> {
    if rate <= -Decimal::ONE {
        return Err(ScenarioError::Validation(
            "monthly_price_escalation must be greater than -1".to_string(),
        ));
    }
    Ok(())
}

/// Scenario repository.
#[derive(Debug, Clone)]
pub struct ScenarioRepository {
    db: DatabaseConnection,
}

impl ScenarioRepository {
    /// Creates a new scenario repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a draft scenario at revision 1.
    pub async fn create(
        &self,
        input: CreateScenarioInput,
    ) -> Result<scenario_projects::Model, ScenarioError> {
        validate_name(&input.name)?;
        validate_duration(input.duration_months)?;
        validate_discount_rate(input.discount_rate)?;
        validate_escalation(input.sales.monthly_price_escalation)?;

        let now = Utc::now().into();
        let scenario = scenario_projects::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(input.name),
            description: Set(input.description),
            currency: Set(input.currency.to_string()),
            start_date: Set(input.start_date),
            duration_months: Set(from_month(input.duration_months)),
            discount_rate: Set(input.discount_rate),
            sales_start_month: Set(from_month(input.sales.sales_start_month)),
            absorption_per_month: Set(from_month(input.sales.absorption_per_month)),
            default_delivery_month: Set(from_month(input.sales.default_delivery_month)),
            monthly_price_escalation: Set(input.sales.monthly_price_escalation),
            status: Set(ScenarioStatus::Draft),
            revision: Set(1),
            approved_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(scenario.insert(&self.db).await?)
    }

    /// Gets a scenario by ID.
    pub async fn get(&self, id: Uuid) -> Result<scenario_projects::Model, ScenarioError> {
        scenario_projects::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(ScenarioError::NotFound(id))
    }

    /// Lists scenarios, newest first.
    pub async fn list(
        &self,
        filter: &ScenarioFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<scenario_projects::Model>, ScenarioError> {
        let page = page.normalized();

        let mut query = scenario_projects::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(scenario_projects::Column::Status.eq(status));
        }

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(scenario_projects::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(items, page.page, page.per_page, total))
    }

    /// Updates a scenario.
    ///
    /// Approved scenarios accept only name and description changes. Any
    /// structural change bumps the revision.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateScenarioInput,
    ) -> Result<scenario_projects::Model, ScenarioError> {
        if let Some(name) = &input.name {
            validate_name(name)?;
        }
        if let Some(months) = input.duration_months {
            validate_duration(months)?;
        }
        if let Some(rate) = input.discount_rate {
            validate_discount_rate(rate)?;
        }
        if let Some(rate) = input.monthly_price_escalation {
            validate_escalation(rate)?;
        }

        let scope = if input.is_structural() {
            EditScope::Structure
        } else {
            EditScope::Metadata
        };

        let txn = self.db.begin().await?;
        let scenario = match check_editable(&txn, id, scope).await? {
            EditCheck::Editable(s) => *s,
            EditCheck::NotFound => return Err(ScenarioError::NotFound(id)),
            EditCheck::Locked(status) => return Err(ScenarioError::Locked { id, status }),
        };

        let structural = input.is_structural();
        let next_revision = scenario.revision + i64::from(structural);
        let mut active: scenario_projects::ActiveModel = scenario.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency.to_string());
        }
        if let Some(start_date) = input.start_date {
            active.start_date = Set(start_date);
        }
        if let Some(months) = input.duration_months {
            active.duration_months = Set(from_month(months));
        }
        if let Some(rate) = input.discount_rate {
            active.discount_rate = Set(rate);
        }
        if let Some(month) = input.sales_start_month {
            active.sales_start_month = Set(from_month(month));
        }
        if let Some(pace) = input.absorption_per_month {
            active.absorption_per_month = Set(from_month(pace));
        }
        if let Some(month) = input.default_delivery_month {
            active.default_delivery_month = Set(from_month(month));
        }
        if let Some(rate) = input.monthly_price_escalation {
            active.monthly_price_escalation = Set(rate);
        }
        active.revision = Set(next_revision);
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes a scenario and everything under it. Approved scenarios must be
    /// archived first.
    pub async fn delete(&self, id: Uuid) -> Result<(), ScenarioError> {
        let txn = self.db.begin().await?;

        let scenario = scenario_projects::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(ScenarioError::NotFound(id))?;

        if scenario.status == ScenarioStatus::Approved {
            return Err(ScenarioError::Locked {
                id,
                status: scenario.status,
            });
        }

        scenario_projects::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Approves a scenario and stores `baseline` as its approved cash flow.
    ///
    /// `expected_revision` is the revision the baseline was projected from;
    /// if the scenario moved on since, nothing is written. Approving an
    /// already approved scenario replaces its baseline.
    pub async fn approve(
        &self,
        id: Uuid,
        expected_revision: i64,
        baseline: &[MonthlyCashFlow],
    ) -> Result<scenario_projects::Model, ScenarioError> {
        let txn = self.db.begin().await?;

        let scenario = scenario_projects::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(ScenarioError::NotFound(id))?;

        if scenario.status == ScenarioStatus::Archived {
            return Err(ScenarioError::InvalidTransition {
                from: scenario.status,
                to: ScenarioStatus::Approved,
            });
        }
        if scenario.revision != expected_revision {
            return Err(ScenarioError::StaleRevision {
                expected: expected_revision,
                actual: scenario.revision,
            });
        }

        scenario_baselines::Entity::delete_many()
            .filter(scenario_baselines::Column::ScenarioId.eq(id))
            .exec(&txn)
            .await?;

        let now = Utc::now();
        let rows: Vec<scenario_baselines::ActiveModel> = baseline
            .iter()
            .map(|month| scenario_baselines::ActiveModel {
                id: Set(Uuid::now_v7()),
                scenario_id: Set(id),
                revision: Set(scenario.revision),
                month: Set(from_month(month.month)),
                label: Set(month.label.clone()),
                period_start: Set(month.period_start),
                inflows: Set(month.inflows),
                outflows: Set(month.outflows),
                project_net: Set(month.project_net),
                financing_net: Set(month.financing_net),
                net: Set(month.net),
                cumulative: Set(month.cumulative),
                project_cumulative: Set(month.project_cumulative),
                breakdown: Set(breakdown_to_json(&month.breakdown)),
                created_at: Set(now.into()),
            })
            .collect();
        if !rows.is_empty() {
            scenario_baselines::Entity::insert_many(rows).exec(&txn).await?;
        }

        let mut active: scenario_projects::ActiveModel = scenario.into();
        active.status = Set(ScenarioStatus::Approved);
        active.approved_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Archives a draft or approved scenario.
    pub async fn archive(&self, id: Uuid) -> Result<scenario_projects::Model, ScenarioError> {
        let txn = self.db.begin().await?;

        let scenario = scenario_projects::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(ScenarioError::NotFound(id))?;

        if scenario.status == ScenarioStatus::Archived {
            return Err(ScenarioError::InvalidTransition {
                from: scenario.status,
                to: ScenarioStatus::Archived,
            });
        }

        let mut active: scenario_projects::ActiveModel = scenario.into();
        active.status = Set(ScenarioStatus::Archived);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Loads the approved baseline, if the scenario has one.
    pub async fn load_baseline(
        &self,
        id: Uuid,
    ) -> Result<Option<Vec<MonthlyCashFlow>>, ScenarioError> {
        let rows = scenario_baselines::Entity::find()
            .filter(scenario_baselines::Column::ScenarioId.eq(id))
            .order_by_asc(scenario_baselines::Column::Month)
            .all(&self.db)
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let months = rows
            .iter()
            .map(baseline_month)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(months))
    }
}
