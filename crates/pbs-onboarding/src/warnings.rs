use std::fmt;

use pbs_auth::site;

use crate::error::OnboardingResult;
use crate::plan::ReconcilePlan;

/// An added site the authorizer would never match as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteWarning {
    pub account_id: String,
    pub site: String,
    /// Canonical form, when the entry normalizes to one.
    pub suggestion: Option<String>,
}

impl fmt::Display for SiteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?} is not a canonical site", self.account_id, self.site)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean {}?)", suggestion)?;
        }
        Ok(())
    }
}

pub fn site_warnings(plan: &ReconcilePlan) -> OnboardingResult<Vec<SiteWarning>> {
    let mut warnings = Vec::new();
    for row in plan.added_rows()? {
        for entry in &row.sites {
            if site::is_canonical(entry) {
                continue;
            }
            warnings.push(SiteWarning {
                account_id: row.account_id.clone(),
                site: entry.clone(),
                suggestion: site::normalize(entry).ok().map(|s| s.into_string()),
            });
        }
    }
    Ok(warnings)
}
