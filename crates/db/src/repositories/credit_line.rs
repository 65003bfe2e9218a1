//! Credit line repository: lines and their scheduled movements.

use std::collections::HashMap;

use chrono::Utc;
use cimiento_core::projection::{
    self as engine, CreditLine, CreditMovement, MovementKind, ProjectMonth, ProjectionError,
};
use cimiento_shared::AppError;
use cimiento_shared::types::CreditLineId;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use super::guard::{EditCheck, EditScope, bump_revision, check_editable};
use crate::convert::{self, ConvertError, from_month};
use crate::entities::{
    scenario_credit_lines, scenario_credit_movements, scenario_projects,
    sea_orm_active_enums::ScenarioStatus,
};

/// Error types for credit line operations.
#[derive(Debug, thiserror::Error)]
pub enum CreditLineError {
    /// Scenario not found.
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(Uuid),

    /// Credit line not found.
    #[error("Credit line not found: {0}")]
    NotFound(Uuid),

    /// Movement not found.
    #[error("Credit movement not found: {0}")]
    MovementNotFound(Uuid),

    /// Scenario status forbids the change.
    #[error("Scenario is {0:?}; credit lines cannot be modified")]
    Locked(ScenarioStatus),

    /// Line or movement failed validation.
    #[error(transparent)]
    Invalid(#[from] ProjectionError),

    /// Stored data could not be read back.
    #[error("Corrupt credit line: {0}")]
    Corrupt(#[from] ConvertError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<CreditLineError> for AppError {
    fn from(e: CreditLineError) -> Self {
        match e {
            CreditLineError::ScenarioNotFound(_)
            | CreditLineError::NotFound(_)
            | CreditLineError::MovementNotFound(_) => Self::NotFound(e.to_string()),
            CreditLineError::Locked(_) => Self::Conflict(e.to_string()),
            CreditLineError::Invalid(ProjectionError::CreditLimitExceeded { .. }) => {
                Self::BusinessRule(e.to_string())
            }
            CreditLineError::Invalid(_) => Self::Validation(e.to_string()),
            CreditLineError::Corrupt(_) => Self::Internal(e.to_string()),
            CreditLineError::Database(_) => Self::Database(e.to_string()),
        }
    }
}

/// Input for a new credit line.
#[derive(Debug, Clone)]
pub struct NewCreditLine {
    /// Display name.
    pub name: String,
    /// Maximum principal.
    pub limit: Decimal,
    /// Nominal annual rate.
    pub annual_rate: Decimal,
    /// First month.
    pub start_month: ProjectMonth,
    /// Term in months.
    pub term_months: u32,
    /// Interest settlement mode.
    pub interest_mode: engine::InterestMode,
    /// Initial movements.
    pub movements: Vec<NewCreditMovement>,
}

/// Input for a new movement.
#[derive(Debug, Clone)]
pub struct NewCreditMovement {
    /// Month of the movement.
    pub month: ProjectMonth,
    /// Drawdown or repayment.
    pub kind: MovementKind,
    /// Amount moved.
    pub amount: Decimal,
    /// Optional note.
    pub note: Option<String>,
}

impl From<&NewCreditMovement> for CreditMovement {
    fn from(m: &NewCreditMovement) -> Self {
        Self {
            month: m.month,
            kind: m.kind,
            amount: m.amount,
        }
    }
}

/// A stored credit line with its movements.
#[derive(Debug, Clone, Serialize)]
pub struct CreditLineWithMovements {
    /// Line row.
    #[serde(flatten)]
    pub line: scenario_credit_lines::Model,
    /// Movement rows ordered by month.
    pub movements: Vec<scenario_credit_movements::Model>,
}

/// Rejects movement sets whose cumulative drawdowns exceed the limit.
fn check_limit(line: &CreditLine) -> Result<(), ProjectionError> {
    let mut movements: Vec<&CreditMovement> = line
        .movements
        .iter()
        .filter(|m| m.kind == MovementKind::Drawdown)
        .collect();
    movements.sort_by_key(|m| m.month);

    let mut drawn = Decimal::ZERO;
    for movement in movements {
        drawn += movement.amount;
        if drawn > line.limit {
            return Err(ProjectionError::CreditLimitExceeded {
                line: line.name.clone(),
                month: movement.month,
            });
        }
    }
    Ok(())
}

fn validate(line: &CreditLine) -> Result<(), ProjectionError> {
    line.validate()?;
    check_limit(line)
}

/// Credit line repository.
#[derive(Debug, Clone)]
pub struct CreditLineRepository {
    db: DatabaseConnection,
}

impl CreditLineRepository {
    /// Creates a new credit line repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn lock_scenario(
        txn: &DatabaseTransaction,
        scenario_id: Uuid,
    ) -> Result<scenario_projects::Model, CreditLineError> {
        match check_editable(txn, scenario_id, EditScope::Structure).await? {
            EditCheck::Editable(s) => Ok(*s),
            EditCheck::NotFound => Err(CreditLineError::ScenarioNotFound(scenario_id)),
            EditCheck::Locked(status) => Err(CreditLineError::Locked(status)),
        }
    }

    async fn find_line(
        txn: &DatabaseTransaction,
        scenario_id: Uuid,
        line_id: Uuid,
    ) -> Result<scenario_credit_lines::Model, CreditLineError> {
        scenario_credit_lines::Entity::find_by_id(line_id)
            .filter(scenario_credit_lines::Column::ScenarioId.eq(scenario_id))
            .one(txn)
            .await?
            .ok_or(CreditLineError::NotFound(line_id))
    }

    async fn insert_movement(
        txn: &DatabaseTransaction,
        line_id: Uuid,
        movement: NewCreditMovement,
    ) -> Result<scenario_credit_movements::Model, DbErr> {
        scenario_credit_movements::ActiveModel {
            id: Set(Uuid::now_v7()),
            credit_line_id: Set(line_id),
            month: Set(from_month(movement.month)),
            kind: Set(movement.kind.into()),
            amount: Set(movement.amount),
            note: Set(movement.note),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await
    }

    /// Creates a credit line together with its initial movements.
    pub async fn create(
        &self,
        scenario_id: Uuid,
        input: NewCreditLine,
    ) -> Result<CreditLineWithMovements, CreditLineError> {
        let line_id = CreditLineId::new();
        validate(&CreditLine {
            id: line_id,
            name: input.name.clone(),
            limit: input.limit,
            annual_rate: input.annual_rate,
            start_month: input.start_month,
            term_months: input.term_months,
            interest_mode: input.interest_mode,
            movements: input.movements.iter().map(CreditMovement::from).collect(),
        })?;

        let txn = self.db.begin().await?;
        let scenario = Self::lock_scenario(&txn, scenario_id).await?;

        let now = Utc::now();
        let line = scenario_credit_lines::ActiveModel {
            id: Set(line_id.into_inner()),
            scenario_id: Set(scenario_id),
            name: Set(input.name),
            credit_limit: Set(input.limit),
            annual_rate: Set(input.annual_rate),
            start_month: Set(from_month(input.start_month)),
            term_months: Set(from_month(input.term_months)),
            interest_mode: Set(input.interest_mode.into()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let mut movements = Vec::with_capacity(input.movements.len());
        for movement in input.movements {
            movements.push(Self::insert_movement(&txn, line.id, movement).await?);
        }
        movements.sort_by_key(|m| m.month);

        bump_revision(&txn, scenario).await?;
        txn.commit().await?;
        Ok(CreditLineWithMovements { line, movements })
    }

    /// Lists a scenario's credit lines with their movements.
    pub async fn list(
        &self,
        scenario_id: Uuid,
    ) -> Result<Vec<CreditLineWithMovements>, CreditLineError> {
        let lines = scenario_credit_lines::Entity::find()
            .filter(scenario_credit_lines::Column::ScenarioId.eq(scenario_id))
            .order_by_asc(scenario_credit_lines::Column::CreatedAt)
            .all(&self.db)
            .await?;
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = lines.iter().map(|l| l.id).collect();
        let all_movements = scenario_credit_movements::Entity::find()
            .filter(scenario_credit_movements::Column::CreditLineId.is_in(ids))
            .order_by_asc(scenario_credit_movements::Column::Month)
            .order_by_asc(scenario_credit_movements::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut by_line: HashMap<Uuid, Vec<scenario_credit_movements::Model>> = HashMap::new();
        for movement in all_movements {
            by_line.entry(movement.credit_line_id).or_default().push(movement);
        }

        Ok(lines
            .into_iter()
            .map(|line| {
                let movements = by_line.remove(&line.id).unwrap_or_default();
                CreditLineWithMovements { line, movements }
            })
            .collect())
    }

    /// Schedules a new movement on an existing line.
    ///
    /// The line is re-validated with the movement included, so a drawdown
    /// that would take cumulative draws over the limit is rejected.
    pub async fn add_movement(
        &self,
        scenario_id: Uuid,
        line_id: Uuid,
        movement: NewCreditMovement,
    ) -> Result<scenario_credit_movements::Model, CreditLineError> {
        let txn = self.db.begin().await?;
        let scenario = Self::lock_scenario(&txn, scenario_id).await?;
        let line = Self::find_line(&txn, scenario_id, line_id).await?;

        let existing = line
            .find_related(scenario_credit_movements::Entity)
            .all(&txn)
            .await?;
        let mut engine_line = convert::credit_line(&line, &existing)?;
        engine_line.movements.push(CreditMovement::from(&movement));
        validate(&engine_line)?;

        let created = Self::insert_movement(&txn, line_id, movement).await?;
        bump_revision(&txn, scenario).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Deletes a credit line and its movements.
    pub async fn delete_line(&self, scenario_id: Uuid, line_id: Uuid) -> Result<(), CreditLineError> {
        let txn = self.db.begin().await?;
        let scenario = Self::lock_scenario(&txn, scenario_id).await?;
        let line = Self::find_line(&txn, scenario_id, line_id).await?;

        line.delete(&txn).await?;
        bump_revision(&txn, scenario).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Deletes a single movement.
    pub async fn delete_movement(
        &self,
        scenario_id: Uuid,
        line_id: Uuid,
        movement_id: Uuid,
    ) -> Result<(), CreditLineError> {
        let txn = self.db.begin().await?;
        let scenario = Self::lock_scenario(&txn, scenario_id).await?;
        Self::find_line(&txn, scenario_id, line_id).await?;

        let movement = scenario_credit_movements::Entity::find_by_id(movement_id)
            .filter(scenario_credit_movements::Column::CreditLineId.eq(line_id))
            .one(&txn)
            .await?
            .ok_or(CreditLineError::MovementNotFound(movement_id))?;

        movement.delete(&txn).await?;
        bump_revision(&txn, scenario).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Loads a scenario's credit lines as engine types.
    pub async fn load(&self, scenario_id: Uuid) -> Result<Vec<CreditLine>, CreditLineError> {
        self.list(scenario_id)
            .await?
            .iter()
            .map(|l| convert::credit_line(&l.line, &l.movements).map_err(CreditLineError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(movements: Vec<(u32, MovementKind, Decimal)>) -> CreditLine {
        CreditLine {
            id: CreditLineId::new(),
            name: "Construction loan".to_string(),
            limit: dec!(100000),
            annual_rate: dec!(0.12),
            start_month: 1,
            term_months: 6,
            interest_mode: engine::InterestMode::Capitalized,
            movements: movements
                .into_iter()
                .map(|(month, kind, amount)| CreditMovement { month, kind, amount })
                .collect(),
        }
    }

    #[test]
    fn test_limit_counts_cumulative_drawdowns() {
        let ok = line(vec![
            (1, MovementKind::Drawdown, dec!(60000)),
            (2, MovementKind::Repayment, dec!(60000)),
            (3, MovementKind::Drawdown, dec!(40000)),
        ]);
        assert!(validate(&ok).is_ok());

        // Repayments do not free up the limit.
        let over = line(vec![
            (1, MovementKind::Drawdown, dec!(60000)),
            (2, MovementKind::Repayment, dec!(60000)),
            (3, MovementKind::Drawdown, dec!(40001)),
        ]);
        assert_eq!(
            validate(&over).unwrap_err(),
            ProjectionError::CreditLimitExceeded {
                line: "Construction loan".to_string(),
                month: 3,
            }
        );
    }

    #[test]
    fn test_movement_outside_term_rejected() {
        let late = line(vec![(7, MovementKind::Drawdown, dec!(1000))]);
        assert!(matches!(
            validate(&late),
            Err(ProjectionError::MovementAfterMaturity { .. })
        ));
    }

    #[test]
    fn test_limit_error_maps_to_business_rule() {
        let err = CreditLineError::Invalid(ProjectionError::CreditLimitExceeded {
            line: "x".into(),
            month: 1,
        });
        assert_eq!(AppError::from(err).status_code(), 422);
    }
}
