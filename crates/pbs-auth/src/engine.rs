//! Authorization decision engine.
//!
//! One strictly ordered pass per request. Each stage either advances or ends
//! the pass with [`Decision::Forbidden`] naming itself; nothing is retried and
//! no error escapes. Which stages run is decided by two inputs:
//!
//! - [`HandlerKind`]: where the caller identity comes from (Lambda request
//!   context or Cloud Function bearer token).
//! - [`MatchingStrategy`]: single-origin exact match (v1) or per-site
//!   membership (v2), picked per request from
//!   [`PER_SITE_ENROLLMENT_HEADER`](crate::headers::PER_SITE_ENROLLMENT_HEADER).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineOptions;
use crate::error::{IdentityError, StoreError};
use crate::headers::{AuthRequest, PER_SITE_ENROLLMENT_HEADER};
use crate::identity;
use crate::site;
use crate::store::LookupStore;

const FORBIDDEN: u16 = 403;

/// Runtime the handler is deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandlerKind {
    /// Identity comes from the authenticated request context (`userArn`).
    Lambda,
    /// Identity comes from the `Authorization` bearer token.
    CloudFunction,
}

/// Every check the engine can fail at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Context,
    Identity,
    UserArn,
    ClaimedOrigin,
    SiteNormalization,
    CallerIdentity,
    RegisteredOrigin,
    OriginCheck,
    RegisteredSites,
    SiteCheck,
}

impl Stage {
    /// Tag reported to operators, in the vocabulary of each handler kind.
    pub fn label(self, kind: HandlerKind) -> &'static str {
        match (self, kind) {
            (Self::Context, _) => "context",
            (Self::Identity, _) => "identity",
            (Self::SiteNormalization, _) => "site",
            (Self::UserArn, HandlerKind::Lambda) => "userArn",
            (Self::UserArn, HandlerKind::CloudFunction) => "user_arn",
            (Self::ClaimedOrigin, HandlerKind::Lambda) => "reportedOrigin",
            (Self::ClaimedOrigin, HandlerKind::CloudFunction) => "reported_origin",
            (Self::CallerIdentity, HandlerKind::Lambda) => "callerIdentity",
            (Self::CallerIdentity, HandlerKind::CloudFunction) => "caller_identity",
            (Self::RegisteredOrigin | Self::OriginCheck, HandlerKind::Lambda) => "reportingOrigin",
            (Self::RegisteredOrigin, HandlerKind::CloudFunction) => "reporting_origin",
            (Self::OriginCheck, HandlerKind::CloudFunction) => "origin_check",
            (Self::RegisteredSites | Self::SiteCheck, HandlerKind::Lambda) => "adtechSites",
            (Self::RegisteredSites, HandlerKind::CloudFunction) => "adtech_sites",
            (Self::SiteCheck, HandlerKind::CloudFunction) => "site_check",
        }
    }
}

/// How a claimed origin is matched against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingStrategy {
    /// v1: claimed origin must equal the registered origin byte for byte.
    ExactOrigin,
    /// v2: normalized claimed site must be one of the registered sites.
    SiteMembership,
}

impl MatchingStrategy {
    /// v2 only when the enrollment header is exactly `"true"`.
    pub fn select(request: &AuthRequest) -> Self {
        match request.header(PER_SITE_ENROLLMENT_HEADER) {
            Some("true") => Self::SiteMembership,
            _ => Self::ExactOrigin,
        }
    }
}

/// Outcome of one authorization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Authorized { domain: String },
    Forbidden { stage: Stage, status: u16 },
}

impl Decision {
    pub fn status(&self) -> u16 {
        match self {
            Self::Authorized { .. } => 200,
            Self::Forbidden { status, .. } => *status,
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Authorized { .. } => None,
            Self::Forbidden { stage, .. } => Some(*stage),
        }
    }
}

/// Internal stop signal; never leaves this module.
struct Denial {
    stage: Stage,
    status: u16,
    reason: String,
}

impl Denial {
    fn at(stage: Stage, reason: impl fmt::Display) -> Self {
        Self {
            stage,
            status: FORBIDDEN,
            reason: reason.to_string(),
        }
    }

    fn store(stage: Stage, err: StoreError) -> Self {
        Self {
            stage,
            status: err.status_code(),
            reason: err.to_string(),
        }
    }
}

pub struct AuthorizationEngine {
    kind: HandlerKind,
    store: Arc<dyn LookupStore>,
    options: EngineOptions,
}

impl fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("kind", &self.kind)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl AuthorizationEngine {
    pub fn new(kind: HandlerKind, store: Arc<dyn LookupStore>, options: EngineOptions) -> Self {
        Self {
            kind,
            store,
            options,
        }
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub async fn authorize(&self, request: &AuthRequest) -> Decision {
        let strategy = MatchingStrategy::select(request);
        debug!(kind = ?self.kind, strategy = ?strategy, "evaluating authorization");

        let outcome = match strategy {
            MatchingStrategy::ExactOrigin => self.exact_origin(request).await,
            MatchingStrategy::SiteMembership => self.site_membership(request).await,
        };

        match outcome {
            Ok(domain) => Decision::Authorized { domain },
            Err(denial) => {
                warn!(
                    stage = denial.stage.label(self.kind),
                    status = denial.status,
                    reason = %denial.reason,
                    "authorization forbidden"
                );
                Decision::Forbidden {
                    stage: denial.stage,
                    status: denial.status,
                }
            }
        }
    }

    async fn exact_origin(&self, request: &AuthRequest) -> Result<String, Denial> {
        let (identity, claimed) = match self.kind {
            HandlerKind::Lambda => {
                let arn = context_user_arn(request)?;
                let claimed = claimed_origin(request)?;
                (identity::rewrite_assumed_role_arn(arn), claimed)
            }
            HandlerKind::CloudFunction => {
                let claimed = claimed_origin(request)?;
                (bearer_identity(request)?, claimed)
            }
        };

        let registered = self
            .store
            .get_registered_origin(&identity)
            .await
            .map_err(|e| Denial::store(Stage::RegisteredOrigin, e))?;

        if registered != claimed {
            return Err(Denial::at(
                Stage::OriginCheck,
                format_args!(
                    "claimed origin {:?} does not match registered origin {:?}",
                    claimed, registered
                ),
            ));
        }

        Ok(claimed.to_string())
    }

    async fn site_membership(&self, request: &AuthRequest) -> Result<String, Denial> {
        let claimed = claimed_origin(request)?;
        let site =
            site::normalize(claimed).map_err(|e| Denial::at(Stage::SiteNormalization, e))?;

        let identity = match self.kind {
            HandlerKind::Lambda => context_user_arn(request)?.to_string(),
            HandlerKind::CloudFunction => bearer_identity(request)?,
        };

        let sites = self
            .store
            .get_registered_sites(&identity)
            .await
            .map_err(|e| Denial::store(Stage::RegisteredSites, e))?;

        if !sites.contains(site.as_str()) {
            return Err(Denial::at(
                Stage::SiteCheck,
                format_args!("site {} is not registered for caller", site),
            ));
        }

        Ok(site.into_string())
    }
}

fn claimed_origin(request: &AuthRequest) -> Result<&str, Denial> {
    request
        .claimed_identity()
        .ok_or_else(|| Denial::at(Stage::ClaimedOrigin, "missing claimed identity header"))
}

fn context_user_arn(request: &AuthRequest) -> Result<&str, Denial> {
    let context = request
        .request_context
        .as_ref()
        .ok_or_else(|| Denial::at(Stage::Context, "missing request context"))?;
    let identity = context
        .identity
        .as_ref()
        .ok_or_else(|| Denial::at(Stage::Identity, "missing identity in request context"))?;
    identity
        .user_arn
        .as_deref()
        .filter(|arn| !arn.is_empty())
        .ok_or_else(|| Denial::at(Stage::UserArn, "missing userArn in request identity"))
}

fn bearer_identity(request: &AuthRequest) -> Result<String, Denial> {
    let resolved = match &request.headers {
        Some(headers) => identity::resolve(headers),
        None => Err(IdentityError::MissingCredential),
    };
    resolved.map_err(|e| Denial::at(Stage::CallerIdentity, e))
}
