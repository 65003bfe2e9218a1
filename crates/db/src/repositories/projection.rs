//! Loads a stored scenario as projection engine input.

use std::collections::HashMap;

use cimiento_core::projection::{ActualEntry, MonthlyCashFlow, ProjectionInput};
use cimiento_shared::AppError;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use uuid::Uuid;

use crate::convert::{self, ConvertError};
use crate::entities::{
    scenario_actuals, scenario_baselines, scenario_cost_items, scenario_credit_lines,
    scenario_credit_movements, scenario_projects, scenario_units,
    sea_orm_active_enums::ScenarioStatus,
};

/// Error types for loading projection data.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionRepoError {
    /// Scenario not found.
    #[error("Scenario not found: {0}")]
    NotFound(Uuid),

    /// Stored data could not be read back.
    #[error("Corrupt scenario data: {0}")]
    Corrupt(#[from] ConvertError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<ProjectionRepoError> for AppError {
    fn from(e: ProjectionRepoError) -> Self {
        match e {
            ProjectionRepoError::NotFound(_) => Self::NotFound(e.to_string()),
            ProjectionRepoError::Corrupt(_) => Self::Internal(e.to_string()),
            ProjectionRepoError::Database(_) => Self::Database(e.to_string()),
        }
    }
}

/// A scenario snapshot ready to project.
#[derive(Debug, Clone)]
pub struct LoadedScenario {
    /// Engine input.
    pub input: ProjectionInput,
    /// Revision the snapshot was read at.
    pub revision: i64,
    /// Lifecycle status at read time.
    pub status: ScenarioStatus,
}

/// Everything needed to compare a scenario against its actuals.
#[derive(Debug, Clone)]
pub struct ComparisonData {
    /// Current snapshot.
    pub scenario: LoadedScenario,
    /// Approved baseline, if the scenario was ever approved.
    pub baseline: Option<Vec<MonthlyCashFlow>>,
    /// Recorded actuals.
    pub actuals: Vec<ActualEntry>,
}

/// Read-side repository for projections.
#[derive(Debug, Clone)]
pub struct ProjectionRepository {
    db: DatabaseConnection,
}

impl ProjectionRepository {
    /// Creates a new projection repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Reads the scenario and all its inputs under a shared lock, so the
    /// snapshot matches the revision it reports.
    pub async fn load_input(&self, id: Uuid) -> Result<LoadedScenario, ProjectionRepoError> {
        let txn = self.db.begin().await?;

        let scenario = scenario_projects::Entity::find_by_id(id)
            .lock_shared()
            .one(&txn)
            .await?
            .ok_or(ProjectionRepoError::NotFound(id))?;

        let cost_rows = scenario_cost_items::Entity::find()
            .filter(scenario_cost_items::Column::ScenarioId.eq(id))
            .order_by_asc(scenario_cost_items::Column::SortOrder)
            .order_by_asc(scenario_cost_items::Column::CreatedAt)
            .all(&txn)
            .await?;

        let line_rows = scenario_credit_lines::Entity::find()
            .filter(scenario_credit_lines::Column::ScenarioId.eq(id))
            .order_by_asc(scenario_credit_lines::Column::CreatedAt)
            .all(&txn)
            .await?;

        let movement_rows = if line_rows.is_empty() {
            Vec::new()
        } else {
            scenario_credit_movements::Entity::find()
                .filter(
                    scenario_credit_movements::Column::CreditLineId
                        .is_in(line_rows.iter().map(|l| l.id).collect::<Vec<_>>()),
                )
                .order_by_asc(scenario_credit_movements::Column::Month)
                .all(&txn)
                .await?
        };

        let unit_rows = scenario_units::Entity::find()
            .filter(scenario_units::Column::ScenarioId.eq(id))
            .order_by_asc(scenario_units::Column::SortOrder)
            .order_by_asc(scenario_units::Column::Code)
            .all(&txn)
            .await?;

        txn.commit().await?;

        let mut movements_by_line: HashMap<Uuid, Vec<scenario_credit_movements::Model>> =
            HashMap::new();
        for movement in movement_rows {
            movements_by_line
                .entry(movement.credit_line_id)
                .or_default()
                .push(movement);
        }

        let costs = cost_rows
            .iter()
            .map(convert::cost_item)
            .collect::<Result<Vec<_>, _>>()?;
        let credit_lines = line_rows
            .iter()
            .map(|line| {
                let movements = movements_by_line
                    .get(&line.id)
                    .map_or(&[][..], Vec::as_slice);
                convert::credit_line(line, movements)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let units = unit_rows
            .iter()
            .map(convert::sales_unit)
            .collect::<Result<Vec<_>, _>>()?;

        let input = ProjectionInput {
            project_id: convert::scenario_id(&scenario),
            name: scenario.name.clone(),
            currency: convert::currency(&scenario)?,
            start_date: scenario.start_date,
            duration_months: convert::to_month("duration_months", scenario.duration_months)?,
            discount_rate: scenario.discount_rate,
            costs,
            credit_lines,
            units,
            sales: convert::sales_assumptions(&scenario)?,
        };

        Ok(LoadedScenario {
            input,
            revision: scenario.revision,
            status: scenario.status,
        })
    }

    /// Loads the scenario snapshot, its approved baseline, and its actuals.
    pub async fn load_comparison(&self, id: Uuid) -> Result<ComparisonData, ProjectionRepoError> {
        let scenario = self.load_input(id).await?;

        let baseline_rows = scenario_baselines::Entity::find()
            .filter(scenario_baselines::Column::ScenarioId.eq(id))
            .order_by_asc(scenario_baselines::Column::Month)
            .all(&self.db)
            .await?;
        let baseline = if baseline_rows.is_empty() {
            None
        } else {
            Some(
                baseline_rows
                    .iter()
                    .map(convert::baseline_month)
                    .collect::<Result<Vec<_>, _>>()?,
            )
        };

        let actuals = scenario_actuals::Entity::find()
            .filter(scenario_actuals::Column::ScenarioId.eq(id))
            .order_by_asc(scenario_actuals::Column::Month)
            .all(&self.db)
            .await?
            .iter()
            .map(convert::actual_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ComparisonData {
            scenario,
            baseline,
            actuals,
        })
    }
}
