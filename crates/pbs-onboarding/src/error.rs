use std::path::PathBuf;

/// Onboarding errors.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    /// Desired-state CSV has no content at all, not even a header.
    #[error("desired state file is empty; it must at least contain the header columns")]
    EmptyDesiredState,

    #[error("unexpected columns at beginning of CSV: expected {expected:?}, got {actual:?}")]
    UnexpectedColumns {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("failed to read desired state: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Store(#[from] pbs_auth::StoreError),

    /// Bucket, database or table the run depends on does not exist.
    #[error("{kind} {name} does not exist")]
    MissingResource { kind: &'static str, name: String },

    #[error("malformed diff line: {line:?}")]
    MalformedDiffLine { line: String },

    #[error("invalid table name: {name:?}")]
    InvalidTableName { name: String },
}

impl OnboardingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type OnboardingResult<T> = Result<T, OnboardingError>;
