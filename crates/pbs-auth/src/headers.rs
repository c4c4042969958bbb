//! Inbound request model shared by both handler kinds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Origin or site the caller claims to act for.
pub const CLAIMED_IDENTITY_HEADER: &str = "x-gscp-claimed-identity";
/// Bearer credential (Cloud Function handlers only).
pub const AUTHORIZATION_HEADER: &str = "Authorization";
/// `"true"` selects per-site (v2) authorization.
pub const PER_SITE_ENROLLMENT_HEADER: &str = "x-gscp-enable-per-site-enrollment";

/// Request headers. Name lookups are exact: `authorization` is not
/// `Authorization`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Claimed origin, treating an empty value as absent.
    pub fn claimed_identity(&self) -> Option<&str> {
        self.get(CLAIMED_IDENTITY_HEADER).filter(|v| !v.is_empty())
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Identity block of an already-authenticated request context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextIdentity {
    #[serde(default)]
    pub user_arn: Option<String>,
}

/// Request context supplied by the Lambda runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub identity: Option<ContextIdentity>,
}

impl RequestContext {
    pub fn for_user_arn(user_arn: impl Into<String>) -> Self {
        Self {
            identity: Some(ContextIdentity {
                user_arn: Some(user_arn.into()),
            }),
        }
    }
}

/// Everything the engine looks at for one authorization request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRequest {
    pub request_context: Option<RequestContext>,
    pub headers: Option<Headers>,
}

impl AuthRequest {
    /// Request carrying headers only (Cloud Function shape).
    pub fn with_headers(headers: Headers) -> Self {
        Self {
            request_context: None,
            headers: Some(headers),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref().and_then(|h| h.get(name))
    }

    pub fn claimed_identity(&self) -> Option<&str> {
        self.headers.as_ref().and_then(Headers::claimed_identity)
    }
}
