//! Edit guard shared by the scenario repositories.
//!
//! Every mutation locks the scenario row first, so concurrent edits of the
//! same scenario serialize and revisions never skip or repeat.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, QuerySelect, Set};
use uuid::Uuid;

use crate::entities::{scenario_projects, sea_orm_active_enums::ScenarioStatus};

/// What a mutation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditScope {
    /// Dates, assumptions, cost items, credit lines.
    Structure,
    /// Name and description.
    Metadata,
    /// Units for sale.
    Sales,
    /// Recorded actuals.
    Actuals,
}

/// Outcome of [`check_editable`].
#[derive(Debug)]
pub(crate) enum EditCheck {
    /// Locked row, ready to edit.
    Editable(Box<scenario_projects::Model>),
    /// No such scenario.
    NotFound,
    /// The scenario's status forbids this edit.
    Locked(ScenarioStatus),
}

/// Whether a scenario in `status` accepts edits of `scope`.
///
/// Drafts accept everything. Approved scenarios keep their structure but
/// still take renames, sales updates and actuals. Archived scenarios are
/// read-only.
pub(crate) const fn allows(status: ScenarioStatus, scope: EditScope) -> bool {
    match status {
        ScenarioStatus::Draft => true,
        ScenarioStatus::Approved => !matches!(scope, EditScope::Structure),
        ScenarioStatus::Archived => false,
    }
}

/// Locks the scenario row (`SELECT ... FOR UPDATE`) and checks its status.
pub(crate) async fn check_editable<C: ConnectionTrait>(
    conn: &C,
    scenario_id: Uuid,
    scope: EditScope,
) -> Result<EditCheck, DbErr> {
    let Some(scenario) = scenario_projects::Entity::find_by_id(scenario_id)
        .lock_exclusive()
        .one(conn)
        .await?
    else {
        return Ok(EditCheck::NotFound);
    };

    if allows(scenario.status, scope) {
        Ok(EditCheck::Editable(Box::new(scenario)))
    } else {
        Ok(EditCheck::Locked(scenario.status))
    }
}

/// Increments the scenario revision so cached projections go stale.
pub(crate) async fn bump_revision<C: ConnectionTrait>(
    conn: &C,
    scenario: scenario_projects::Model,
) -> Result<scenario_projects::Model, DbErr> {
    let next = scenario.revision + 1;
    let mut active: scenario_projects::ActiveModel = scenario.into();
    active.revision = Set(next);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows() {
        for scope in [
            EditScope::Structure,
            EditScope::Metadata,
            EditScope::Sales,
            EditScope::Actuals,
        ] {
            assert!(allows(ScenarioStatus::Draft, scope));
            assert!(!allows(ScenarioStatus::Archived, scope));
        }
        assert!(!allows(ScenarioStatus::Approved, EditScope::Structure));
        assert!(allows(ScenarioStatus::Approved, EditScope::Metadata));
        assert!(allows(ScenarioStatus::Approved, EditScope::Sales));
        assert!(allows(ScenarioStatus::Approved, EditScope::Actuals));
    }
}
