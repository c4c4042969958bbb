//! Operator onboarding for per-site authorization.
//!
//! The operator keeps the allowlist as a local CSV (`AccountId,AdtechSites`).
//! A copy of the last applied state lives in a state bucket; each run diffs
//! the two, shows the resulting deletions and insertions, and after
//! confirmation applies them to the allowlist table and records the new
//! state.

pub mod bucket;
pub mod db;
pub mod diff;
pub mod dml;
pub mod error;
pub mod plan;
pub mod reconcile;
pub mod state;
pub mod warnings;

pub use bucket::{FsBucket, StateBucket};
pub use db::{AllowlistDb, SqliteAllowlistDb};
pub use diff::{diff_states, DiffKind, DiffLine};
pub use dml::{render_delete, render_insert};
pub use error::{OnboardingError, OnboardingResult};
pub use plan::{parse_diff_line, plan_actions, AllowlistRow, ReconcilePlan};
pub use reconcile::{reconcile, PendingChanges, ReconcileOutcome};
pub use state::load_desired_state;
pub use warnings::{site_warnings, SiteWarning};
