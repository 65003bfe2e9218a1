//! Sales unit repository.

use std::collections::HashSet;

use chrono::Utc;
use cimiento_core::projection::{self as engine, ProjectMonth, ProjectionError, SalesUnit};
use cimiento_shared::AppError;
use cimiento_shared::types::SalesUnitId;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::guard::{EditCheck, EditScope, bump_revision, check_editable};
use crate::convert::{self, ConvertError, from_month};
use crate::entities::{scenario_projects, scenario_units, sea_orm_active_enums::ScenarioStatus};

/// Error types for sales unit operations.
#[derive(Debug, thiserror::Error)]
pub enum SalesUnitError {
    /// Scenario not found.
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(Uuid),

    /// Unit not found.
    #[error("Unit not found: {0}")]
    NotFound(Uuid),

    /// Unit code already used in the scenario.
    #[error("Unit code already exists: {0}")]
    DuplicateCode(String),

    /// Scenario status forbids the change.
    #[error("Scenario is {0:?}; units cannot be modified")]
    Locked(ScenarioStatus),

    /// Unit failed validation.
    #[error(transparent)]
    Invalid(#[from] ProjectionError),

    /// Stored data could not be read back.
    #[error("Corrupt unit: {0}")]
    Corrupt(#[from] ConvertError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<SalesUnitError> for AppError {
    fn from(e: SalesUnitError) -> Self {
        match e {
            SalesUnitError::ScenarioNotFound(_) | SalesUnitError::NotFound(_) => {
                Self::NotFound(e.to_string())
            }
            SalesUnitError::DuplicateCode(_) | SalesUnitError::Locked(_) => {
                Self::Conflict(e.to_string())
            }
            SalesUnitError::Invalid(_) => Self::Validation(e.to_string()),
            SalesUnitError::Corrupt(_) => Self::Internal(e.to_string()),
            SalesUnitError::Database(_) => Self::Database(e.to_string()),
        }
    }
}

/// Input for a new unit.
#[derive(Debug, Clone)]
pub struct NewSalesUnit {
    /// Unit code, unique within the scenario.
    pub code: String,
    /// Typology.
    pub typology: Option<String>,
    /// Sellable area.
    pub area_m2: Decimal,
    /// List price.
    pub list_price: Decimal,
    /// Discount in percent.
    pub discount_pct: Decimal,
    /// Commercial status.
    pub status: engine::UnitStatus,
    /// Fixed sale month.
    pub sale_month: Option<ProjectMonth>,
    /// Fixed delivery month.
    pub delivery_month: Option<ProjectMonth>,
    /// Down payment in percent.
    pub down_payment_pct: Decimal,
    /// Down payment installments.
    pub down_payment_installments: u32,
}

/// Commercial update of a unit. `None` leaves a field unchanged; the inner
/// `None` of the month fields clears a fixed month.
#[derive(Debug, Clone, Default)]
pub struct UpdateSalesUnit {
    /// New status.
    pub status: Option<engine::UnitStatus>,
    /// New sale month.
    pub sale_month: Option<Option<ProjectMonth>>,
    /// New delivery month.
    pub delivery_month: Option<Option<ProjectMonth>>,
    /// New list price.
    pub list_price: Option<Decimal>,
    /// New discount.
    pub discount_pct: Option<Decimal>,
}

impl NewSalesUnit {
    fn to_engine(&self, id: SalesUnitId) -> SalesUnit {
        SalesUnit {
            id,
            code: self.code.clone(),
            typology: self.typology.clone(),
            area_m2: self.area_m2,
            list_price: self.list_price,
            discount_pct: self.discount_pct,
            status: self.status,
            sale_month: self.sale_month,
            delivery_month: self.delivery_month,
            down_payment_pct: self.down_payment_pct,
            down_payment_installments: self.down_payment_installments,
        }
    }
}

/// Returns the first code that appears twice.
fn first_duplicate<'a>(codes: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    codes.into_iter().find(|code| !seen.insert(*code))
}

/// Sales unit repository.
#[derive(Debug, Clone)]
pub struct SalesUnitRepository {
    db: DatabaseConnection,
}

impl SalesUnitRepository {
    /// Creates a new sales unit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn lock_scenario(
        txn: &DatabaseTransaction,
        scenario_id: Uuid,
        scope: EditScope,
    ) -> Result<scenario_projects::Model, SalesUnitError> {
        match check_editable(txn, scenario_id, scope).await? {
            EditCheck::Editable(s) => Ok(*s),
            EditCheck::NotFound => Err(SalesUnitError::ScenarioNotFound(scenario_id)),
            EditCheck::Locked(status) => Err(SalesUnitError::Locked(status)),
        }
    }

    async fn find_unit(
        txn: &DatabaseTransaction,
        scenario_id: Uuid,
        unit_id: Uuid,
    ) -> Result<scenario_units::Model, SalesUnitError> {
        scenario_units::Entity::find_by_id(unit_id)
            .filter(scenario_units::Column::ScenarioId.eq(scenario_id))
            .one(txn)
            .await?
            .ok_or(SalesUnitError::NotFound(unit_id))
    }

    /// Adds units to a draft scenario in one transaction.
    pub async fn create_many(
        &self,
        scenario_id: Uuid,
        units: Vec<NewSalesUnit>,
    ) -> Result<Vec<scenario_units::Model>, SalesUnitError> {
        for unit in &units {
            unit.to_engine(SalesUnitId::new()).validate()?;
        }
        if let Some(code) = first_duplicate(units.iter().map(|u| u.code.as_str())) {
            return Err(SalesUnitError::DuplicateCode(code.to_string()));
        }

        let txn = self.db.begin().await?;
        let scenario = Self::lock_scenario(&txn, scenario_id, EditScope::Structure).await?;

        let existing = scenario_units::Entity::find()
            .filter(scenario_units::Column::ScenarioId.eq(scenario_id))
            .all(&txn)
            .await?;
        if let Some(code) = first_duplicate(
            existing
                .iter()
                .map(|u| u.code.as_str())
                .chain(units.iter().map(|u| u.code.as_str())),
        ) {
            return Err(SalesUnitError::DuplicateCode(code.to_string()));
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(units.len());
        for (offset, unit) in units.into_iter().enumerate() {
            let sort_order = i32::try_from(existing.len() + offset).unwrap_or(i32::MAX);
            let model = scenario_units::ActiveModel {
                id: Set(Uuid::now_v7()),
                scenario_id: Set(scenario_id),
                code: Set(unit.code),
                typology: Set(unit.typology),
                area_m2: Set(unit.area_m2),
                list_price: Set(unit.list_price),
                discount_pct: Set(unit.discount_pct),
                status: Set(unit.status.into()),
                sale_month: Set(unit.sale_month.map(from_month)),
                delivery_month: Set(unit.delivery_month.map(from_month)),
                down_payment_pct: Set(unit.down_payment_pct),
                down_payment_installments: Set(from_month(unit.down_payment_installments)),
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

    /// Lists a scenario's units in sales order.
    pub async fn list(&self, scenario_id: Uuid) -> Result<Vec<scenario_units::Model>, SalesUnitError> {
        Ok(scenario_units::Entity::find()
            .filter(scenario_units::Column::ScenarioId.eq(scenario_id))
            .order_by_asc(scenario_units::Column::SortOrder)
            .order_by_asc(scenario_units::Column::Code)
            .all(&self.db)
            .await?)
    }

    /// Applies a commercial update. Allowed on approved scenarios too.
    pub async fn update(
        &self,
        scenario_id: Uuid,
        unit_id: Uuid,
        input: UpdateSalesUnit,
    ) -> Result<scenario_units::Model, SalesUnitError> {
        let txn = self.db.begin().await?;
        let scenario = Self::lock_scenario(&txn, scenario_id, EditScope::Sales).await?;
        let existing = Self::find_unit(&txn, scenario_id, unit_id).await?;

        let mut candidate = convert::sales_unit(&existing)?;
        if let Some(status) = input.status {
            candidate.status = status;
        }
        if let Some(month) = input.sale_month {
            candidate.sale_month = month;
        }
        if let Some(month) = input.delivery_month {
            candidate.delivery_month = month;
        }
        if let Some(price) = input.list_price {
            candidate.list_price = price;
        }
        if let Some(discount) = input.discount_pct {
            candidate.discount_pct = discount;
        }
        candidate.validate()?;

        let mut active: scenario_units::ActiveModel = existing.into();
        active.status = Set(candidate.status.into());
        active.sale_month = Set(candidate.sale_month.map(from_month));
        active.delivery_month = Set(candidate.delivery_month.map(from_month));
        active.list_price = Set(candidate.list_price);
        active.discount_pct = Set(candidate.discount_pct);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await?;

        bump_revision(&txn, scenario).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Removes a unit from a draft scenario.
    pub async fn delete(&self, scenario_id: Uuid, unit_id: Uuid) -> Result<(), SalesUnitError> {
        let txn = self.db.begin().await?;
        let scenario = Self::lock_scenario(&txn, scenario_id, EditScope::Structure).await?;
        let unit = Self::find_unit(&txn, scenario_id, unit_id).await?;

        unit.delete(&txn).await?;
        bump_revision(&txn, scenario).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Loads a scenario's units as engine types.
    pub async fn load(&self, scenario_id: Uuid) -> Result<Vec<SalesUnit>, SalesUnitError> {
        self.list(scenario_id)
            .await?
            .iter()
            .map(|m| convert::sales_unit(m).map_err(SalesUnitError::from))
            .collect()
    }
}
