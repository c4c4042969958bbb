//! One onboarding run: compare, confirm, apply, record.

use std::path::Path;

use tracing::{info, warn};

use crate::bucket::StateBucket;
use crate::db::AllowlistDb;
use crate::diff::diff_states;
use crate::error::{OnboardingError, OnboardingResult};
use crate::plan::{plan_actions, AllowlistRow, ReconcilePlan};
use crate::state::load_desired_state;
use crate::warnings::site_warnings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Remote state already matches the desired state.
    NothingToDo,
    /// Operator did not confirm; nothing was changed.
    Declined,
    Applied { removed: usize, added: usize },
}

/// What a run is about to do, shown to the operator before confirming.
#[derive(Debug, Clone, Copy)]
pub struct PendingChanges<'a> {
    pub plan: &'a ReconcilePlan,
    /// Parsed removal rows, exactly as they will be applied.
    pub removals: &'a [AllowlistRow],
    pub additions: &'a [AllowlistRow],
}

/// Bring the allowlist table and the remote state file in line with the CSV
/// at `desired_path`.
///
/// `confirm` sees the plan and its parsed rows before anything is written. The table is updated
/// first; the remote state is only replaced once that succeeded.
pub fn reconcile<B, D, F>(
    bucket: &B,
    state_object: &str,
    desired_path: &Path,
    db: &mut D,
    confirm: F,
) -> OnboardingResult<ReconcileOutcome>
where
    B: StateBucket + ?Sized,
    D: AllowlistDb + ?Sized,
    F: FnOnce(PendingChanges<'_>) -> bool,
{
    if !bucket.exists() {
        return Err(OnboardingError::MissingResource {
            kind: "bucket",
            name: bucket.name(),
        });
    }
    db.resources_exist()?;

    let current = match bucket.load(state_object)? {
        Some(current) => current,
        None => {
            info!(object = state_object, "remote state missing, creating it empty");
            bucket.create(state_object)?;
            String::new()
        }
    };

    let desired = load_desired_state(desired_path)?;
    let plan = plan_actions(&diff_states(&current, &desired));
    if plan.is_empty() {
        return Ok(ReconcileOutcome::NothingToDo);
    }

    let removals = plan.removed_rows()?;
    let additions = plan.added_rows()?;
    for warning in site_warnings(&plan)? {
        warn!(account = %warning.account_id, site = %warning.site, "{}", warning);
    }

    let pending = PendingChanges {
        plan: &plan,
        removals: &removals,
        additions: &additions,
    };
    if !confirm(pending) {
        return Ok(ReconcileOutcome::Declined);
    }

    db.apply(&removals, &additions)?;
    bucket.replace(state_object, &desired)?;

    Ok(ReconcileOutcome::Applied {
        removed: removals.len(),
        added: additions.len(),
    })
}
