//! Error types for the authorization engine and its collaborators.
//!
//! None of these cross the engine boundary: every failure is turned into a
//! [`Decision::Forbidden`](crate::Decision::Forbidden) at the stage that raised it.

/// Claimed origin could not be reduced to a canonical site.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// Nothing left after stripping scheme, port and path.
    #[error("claimed origin has an empty host")]
    EmptyHost,

    /// Host is itself a public suffix or otherwise has no registrable domain.
    #[error("no registrable domain for host: {host}")]
    NoRegistrableDomain { host: String },
}

/// Caller identity could not be derived from the bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("no bearer credential present")]
    MissingCredential,

    #[error("credential is not a dot-delimited token")]
    MalformedCredential,

    #[error("claims segment is not valid base64: {message}")]
    Decode { message: String },

    #[error("claims segment is not a JSON object: {message}")]
    Parse { message: String },

    #[error("claims have no '{field}' field")]
    MissingIdentityField { field: &'static str },
}

/// Lookup store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record for this identity.
    #[error("no record for identity: {identity}")]
    NotFound { identity: String },

    /// More than one single-origin record for this identity.
    #[error("{count} records for identity: {identity}")]
    Ambiguous { identity: String, count: usize },

    /// Store is temporarily unable to serve (maps to 503).
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// Store failed for a non-transient reason.
    #[error("store error: {message}")]
    Backend { message: String, status: Option<u16> },

    /// Store is misconfigured.
    #[error("store configuration error: {message}")]
    Config { message: String },
}

impl StoreError {
    /// HTTP status an authorization response should carry for this error.
    ///
    /// Lookup misses are ordinary denials; only store-side failures are
    /// allowed to change the status away from 403.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } | Self::Ambiguous { .. } => 403,
            Self::Unavailable { .. } => 503,
            Self::Backend {
                status: Some(status),
                ..
            } if (500..=599).contains(status) => *status,
            Self::Backend { .. } => 500,
            Self::Config { .. } => 500,
        }
    }

    /// Whether the failure is transient on the store side.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Whether the identity simply has no usable record.
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Ambiguous { .. })
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Unavailable {
                message: err.to_string(),
            }
        } else {
            Self::Backend {
                message: err.to_string(),
                status: err.status().map(|s| s.as_u16()),
            }
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => Self::Unavailable {
                message: err.to_string(),
            },
            _ => Self::Backend {
                message: err.to_string(),
                status: None,
            },
        }
    }
}

/// Result type for lookup store operations.
pub type StoreResult<T> = Result<T, StoreError>;
