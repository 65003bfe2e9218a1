//! Recorded actuals: real cash movements per month and line.

use chrono::Utc;
use cimiento_core::projection::{ActualEntry, CashFlowLine, ProjectMonth};
use cimiento_shared::AppError;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::guard::{EditCheck, EditScope, check_editable};
use crate::convert::{self, ConvertError, from_month};
use crate::entities::{scenario_actuals, sea_orm_active_enums::ScenarioStatus};

/// Error types for actuals.
#[derive(Debug, thiserror::Error)]
pub enum ActualError {
    /// Scenario not found.
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(Uuid),

    /// Actual entry not found.
    #[error("Actual entry not found: {0}")]
    NotFound(Uuid),

    /// Scenario status forbids the change.
    #[error("Scenario is {0:?}; actuals cannot be recorded")]
    Locked(ScenarioStatus),

    /// Amounts are stored unsigned; the line decides the direction.
    #[error("Actual amount for {line} in month {month} cannot be negative")]
    NegativeAmount {
        /// Line of the offending entry.
        line: CashFlowLine,
        /// Month of the offending entry.
        month: ProjectMonth,
    },

    /// Stored data could not be read back.
    #[error("Corrupt actual entry: {0}")]
    Corrupt(#[from] ConvertError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ActualError> for AppError {
    fn from(e: ActualError) -> Self {
        match e {
            ActualError::ScenarioNotFound(_) | ActualError::NotFound(_) => {
                Self::NotFound(e.to_string())
            }
            ActualError::Locked(_) => Self::Conflict(e.to_string()),
            ActualError::NegativeAmount { .. } => Self::Validation(e.to_string()),
            ActualError::Corrupt(_) => Self::Internal(e.to_string()),
            ActualError::Database(_) => Self::Database(e.to_string()),
        }
    }
}

/// Input for one recorded amount.
#[derive(Debug, Clone)]
pub struct NewActual {
    /// Project month.
    pub month: ProjectMonth,
    /// Cash-flow line.
    pub line: CashFlowLine,
    /// Amount, always positive.
    pub amount: Decimal,
    /// Optional note.
    pub note: Option<String>,
}

fn validate(entries: &[NewActual]) -> Result<(), ActualError> {
    match entries
        .iter()
        .find(|e| e.amount.is_sign_negative() && !e.amount.is_zero())
    {
        Some(e) => Err(ActualError::NegativeAmount {
            line: e.line,
            month: e.month,
        }),
        None => Ok(()),
    }
}

/// Actuals repository.
#[derive(Debug, Clone)]
pub struct ActualRepository {
    db: DatabaseConnection,
}

impl ActualRepository {
    /// Creates a new actuals repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a batch of actuals.
    ///
    /// Actuals do not change the projection, so the scenario revision is
    /// left alone.
    pub async fn record_many(
        &self,
        scenario_id: Uuid,
        entries: Vec<NewActual>,
    ) -> Result<Vec<scenario_actuals::Model>, ActualError> {
        validate(&entries)?;

        let txn = self.db.begin().await?;
        match check_editable(&txn, scenario_id, EditScope::Actuals).await? {
            EditCheck::Editable(_) => {}
            EditCheck::NotFound => return Err(ActualError::ScenarioNotFound(scenario_id)),
            EditCheck::Locked(status) => return Err(ActualError::Locked(status)),
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            let model = scenario_actuals::ActiveModel {
                id: Set(Uuid::now_v7()),
                scenario_id: Set(scenario_id),
                month: Set(from_month(entry.month)),
                line_key: Set(entry.line.to_string()),
                amount: Set(entry.amount),
                note: Set(entry.note),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;
            created.push(model);
        }

        txn.commit().await?;
        Ok(created)
    }

    /// Lists actuals, optionally limited to one month.
    pub async fn list(
        &self,
        scenario_id: Uuid,
        month: Option<ProjectMonth>,
    ) -> Result<Vec<scenario_actuals::Model>, ActualError> {
        let mut query =
            scenario_actuals::Entity::find().filter(scenario_actuals::Column::ScenarioId.eq(scenario_id));
        if let Some(month) = month {
            query = query.filter(scenario_actuals::Column::Month.eq(from_month(month)));
        }

        Ok(query
            .order_by_asc(scenario_actuals::Column::Month)
            .order_by_asc(scenario_actuals::Column::LineKey)
            .order_by_asc(scenario_actuals::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Deletes one recorded actual.
    pub async fn delete(&self, scenario_id: Uuid, actual_id: Uuid) -> Result<(), ActualError> {
        let txn = self.db.begin().await?;
        match check_editable(&txn, scenario_id, EditScope::Actuals).await? {
            EditCheck::Editable(_) => {}
            EditCheck::NotFound => return Err(ActualError::ScenarioNotFound(scenario_id)),
            EditCheck::Locked(status) => return Err(ActualError::Locked(status)),
        }

        let actual = scenario_actuals::Entity::find_by_id(actual_id)
            .filter(scenario_actuals::Column::ScenarioId.eq(scenario_id))
            .one(&txn)
            .await?
            .ok_or(ActualError::NotFound(actual_id))?;
        actual.delete(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    /// Loads all actuals of a scenario as engine entries.
    pub async fn load(&self, scenario_id: Uuid) -> Result<Vec<ActualEntry>, ActualError> {
        self.list(scenario_id, None)
            .await?
            .iter()
            .map(|m| convert::actual_entry(m).map_err(ActualError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimiento_core::projection::CostCategory;
    use rust_decimal_macros::dec;

    fn entry(amount: Decimal) -> NewActual {
        NewActual {
            month: 3,
            line: CashFlowLine::Cost(CostCategory::Construction),
            amount,
            note: None,
        }
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(validate(&[entry(dec!(100)), entry(dec!(0))]).is_ok());

        let err = validate(&[entry(dec!(100)), entry(dec!(-1))]).unwrap_err();
        assert!(matches!(err, ActualError::NegativeAmount { month: 3, .. }));
        assert_eq!(AppError::from(err).status_code(), 400);
    }
}
