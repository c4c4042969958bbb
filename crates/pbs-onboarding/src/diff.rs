//! Line diff between the remote (applied) state and the desired state.

use std::fmt;

use similar::{Algorithm, ChangeTag, TextDiff};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Removed,
    Added,
    Unchanged,
}

impl DiffKind {
    pub fn marker(self) -> &'static str {
        match self {
            Self::Removed => "- ",
            Self::Added => "+ ",
            Self::Unchanged => "  ",
        }
    }
}

/// One state row with its diff marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffKind,
    pub row: String,
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.marker(), self.row)
    }
}

/// Compare two state texts line by line. Trailing newlines are ignored.
pub fn diff_states(current: &str, desired: &str) -> Vec<DiffLine> {
    let old: Vec<&str> = current.lines().collect();
    let new: Vec<&str> = desired.lines().collect();

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(old.as_slice(), new.as_slice());

    diff.iter_all_changes()
        .map(|change| DiffLine {
            kind: match change.tag() {
                ChangeTag::Delete => DiffKind::Removed,
                ChangeTag::Insert => DiffKind::Added,
                ChangeTag::Equal => DiffKind::Unchanged,
            },
            row: change.value().to_string(),
        })
        .collect()
}
