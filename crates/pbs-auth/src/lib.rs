//! Caller authorization for privacy budget service requests.
//!
//! Decides whether an authenticated caller may act for the origin (or site)
//! it claims in `x-gscp-claimed-identity`:
//!
//! - Single-origin (v1): the claimed origin must equal the caller's
//!   registered reporting origin.
//! - Per-site (v2, `x-gscp-enable-per-site-enrollment: true`): the claimed
//!   origin is reduced to its registrable site, which must be one of the
//!   caller's registered adtech sites.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pbs_auth::{lambda, AuthorizationEngine, EngineOptions, HandlerKind, MemoryStore};
//!
//! # async fn example() {
//! let store = MemoryStore::new()
//!     .with_origin("arn:aws:iam::123456789012:role/demo", "my-reported-origin.com");
//! let engine = AuthorizationEngine::new(HandlerKind::Lambda, Arc::new(store), EngineOptions::default());
//!
//! let event = serde_json::json!({
//!     "requestContext": {"identity": {"userArn": "arn:aws:iam::123456789012:role/demo"}},
//!     "headers": {"x-gscp-claimed-identity": "my-reported-origin.com"}
//! });
//! let response = lambda::handle(&engine, &event).await;
//! assert_eq!(response.status_code, 200);
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `PBS_AUTH_ADD_FAILURE_STAGE_CONTEXT` | `1`/`true` adds the failing stage to forbidden responses |
//! | `PBS_AUTH_SQLITE_PATH` | SQLite lookup store |
//! | `PBS_AUTH_STORE_URL` | HTTP lookup store (wins over SQLite) |
//! | `PBS_AUTH_ORIGIN_TABLE` | v1 table (default: `ReportingOriginAuth`) |
//! | `PBS_AUTH_SITES_TABLE` | v2 table (default: `AdtechSitesAuth`) |
//! | `PBS_AUTH_STORE_TIMEOUT` | HTTP store timeout in seconds (default: 10) |

pub mod cloud_function;
pub mod config;
pub mod engine;
pub mod error;
pub mod headers;
pub mod identity;
pub mod lambda;
pub mod response;
pub mod site;
pub mod store;

pub use cloud_function::{FunctionRequest, FunctionResponse};
pub use config::{AuthConfig, EngineOptions, StoreBackend, StoreConfig};
pub use engine::{AuthorizationEngine, Decision, HandlerKind, MatchingStrategy, Stage};
pub use error::{IdentityError, NormalizeError, StoreError, StoreResult};
pub use headers::{
    AuthRequest, ContextIdentity, Headers, RequestContext, AUTHORIZATION_HEADER,
    CLAIMED_IDENTITY_HEADER, PER_SITE_ENROLLMENT_HEADER,
};
pub use lambda::LambdaResponse;
pub use site::{normalize, CanonicalSite};
pub use store::{connect, HttpStore, LookupStore, MemoryStore, SqliteStore};
