//! What a reconcile run would change.

use crate::diff::{DiffKind, DiffLine};
use crate::error::{OnboardingError, OnboardingResult};

/// Rows to delete and insert, kept as rendered diff lines (`"- row"`, `"+ row"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub removals: Vec<String>,
    pub additions: Vec<String>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.additions.is_empty()
    }

    pub fn removed_rows(&self) -> OnboardingResult<Vec<AllowlistRow>> {
        self.removals.iter().map(|l| parse_diff_line(l)).collect()
    }

    pub fn added_rows(&self) -> OnboardingResult<Vec<AllowlistRow>> {
        self.additions.iter().map(|l| parse_diff_line(l)).collect()
    }
}

pub fn plan_actions(diff: &[DiffLine]) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    for line in diff {
        match line.kind {
            DiffKind::Removed => plan.removals.push(line.to_string()),
            DiffKind::Added => plan.additions.push(line.to_string()),
            DiffKind::Unchanged => {}
        }
    }
    plan
}

/// One allowlist entry as it is written to the sites table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlistRow {
    pub account_id: String,
    pub sites: Vec<String>,
}

/// Parse a rendered diff line such as
/// `+ email@domain.com,"[https://a.com, https://b.com]"`.
pub fn parse_diff_line(line: &str) -> OnboardingResult<AllowlistRow> {
    let malformed = || OnboardingError::MalformedDiffLine {
        line: line.to_string(),
    };

    let row = ["- ", "+ ", "  "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .ok_or_else(malformed)?;

    let (account, sites) = row.split_once(',').ok_or_else(malformed)?;
    let account = account.trim();
    if account.is_empty() {
        return Err(malformed());
    }

    let sites = sites
        .trim_matches(|c| matches!(c, '"' | '\'' | '[' | ']'))
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    Ok(AllowlistRow {
        account_id: account.to_string(),
        sites,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_states;

    #[test]
    fn removal_only() {
        let remote = "aaa@email.com,[https://domain-a.com]\nbbb@email.com,[https://domain-b.com]\nccc@email.com,[https://domain-c.com]\n";
        let local = "bbb@email.com,[https://domain-b.com]\nccc@email.com,[https://domain-c.com]";

        let plan = plan_actions(&diff_states(remote, local));
        assert_eq!(plan.removals, vec!["- aaa@email.com,[https://domain-a.com]"]);
        assert!(plan.additions.is_empty());
    }

    #[test]
    fn addition_only() {
        let remote = "aaa@email.com,[https://domain-a.com]\nccc@email.com,[https://domain-c.com]\n";
        let local = "aaa@email.com,[https://domain-a.com]\nbbb@email.com,[https://domain-b.com]\nccc@email.com,[https://domain-c.com]\n";

        let plan = plan_actions(&diff_states(remote, local));
        assert!(plan.removals.is_empty());
        assert_eq!(plan.additions, vec!["+ bbb@email.com,[https://domain-b.com]"]);
    }

    #[test]
    fn replacement() {
        let remote = "aaa@email.com,[https://domain-a.com]\nbbb@email.com,[https://domain-b.com]\nccc@email.com,[https://domain-c.com]\n";
        let local = "aaa@email.com,[https://domain-a.com]\nbbb@email.com,[https://domain-b.com]\nccc@email.com,\"[https://domain-c.com, https://domain-cc.com]\"\n";

        let plan = plan_actions(&diff_states(remote, local));
        assert_eq!(plan.removals, vec!["- ccc@email.com,[https://domain-c.com]"]);
        assert_eq!(
            plan.additions,
            vec!["+ ccc@email.com,\"[https://domain-c.com, https://domain-cc.com]\""]
        );
    }

    #[test]
    fn no_changes_is_empty() {
        let state = "aaa@email.com,[https://domain-a.com]\n";
        assert!(plan_actions(&diff_states(state, state)).is_empty());
    }

    #[test]
    fn parses_quoted_site_list() {
        let row =
            parse_diff_line("+ ccc@email.com,\"[https://domain-c.com, https://domain-cc.com]\"")
                .unwrap();
        assert_eq!(row.account_id, "ccc@email.com");
        assert_eq!(
            row.sites,
            vec!["https://domain-c.com", "https://domain-cc.com"]
        );
    }

    #[test]
    fn empty_site_entries_are_dropped() {
        let row = parse_diff_line("- a@x.com,[]").unwrap();
        assert!(row.sites.is_empty());
        let row = parse_diff_line("- a@x.com,\"[https://a.com,, ]\"").unwrap();
        assert_eq!(row.sites, vec!["https://a.com"]);
    }

    #[test]
    fn malformed_lines() {
        for line in ["a@x.com,[https://a.com]", "- a@x.com", "+ ,[https://a.com]", "? ^"] {
            assert!(
                matches!(
                    parse_diff_line(line),
                    Err(OnboardingError::MalformedDiffLine { .. })
                ),
                "{line}"
            );
        }
    }
}
