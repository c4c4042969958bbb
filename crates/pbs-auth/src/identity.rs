//! Caller identity resolution.
//!
//! Signatures are verified by the gateway in front of the handlers; this
//! module only decodes the claims segment of the bearer token to find out
//! who is calling.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine as _,
};

use crate::error::IdentityError;
use crate::headers::{Headers, AUTHORIZATION_HEADER};

/// Claims field that carries the caller principal.
pub const IDENTITY_CLAIM: &str = "email";

const STS_ARN_PREFIX: &str = "arn:aws:sts::";

/// Resolve the caller identity from the bearer credential in `headers`.
pub fn resolve(headers: &Headers) -> Result<String, IdentityError> {
    let credential = headers
        .get(AUTHORIZATION_HEADER)
        .filter(|v| !v.trim().is_empty())
        .ok_or(IdentityError::MissingCredential)?;

    identity_from_token(strip_scheme(credential))
}

/// Decode the claims segment of a `header.claims.signature` token.
pub fn identity_from_token(token: &str) -> Result<String, IdentityError> {
    let mut segments = token.split('.');
    let claims_segment = match (segments.next(), segments.next()) {
        (Some(_), Some(claims)) if !claims.is_empty() => claims,
        _ => return Err(IdentityError::MalformedCredential),
    };

    let padded = pad_base64(claims_segment);
    let decoded = STANDARD
        .decode(&padded)
        .or_else(|_| URL_SAFE.decode(&padded))
        .map_err(|e| IdentityError::Decode {
            message: e.to_string(),
        })?;

    let claims: serde_json::Value =
        serde_json::from_slice(&decoded).map_err(|e| IdentityError::Parse {
            message: e.to_string(),
        })?;

    match claims.get(IDENTITY_CLAIM) {
        Some(serde_json::Value::String(identity)) if !identity.is_empty() => {
            Ok(identity.clone())
        }
        _ => Err(IdentityError::MissingIdentityField {
            field: IDENTITY_CLAIM,
        }),
    }
}

/// Rewrite an STS assumed-role ARN into the IAM role ARN it was assumed from.
///
/// `arn:aws:sts::<account>:assumed-role/<role>/<session>` becomes
/// `arn:aws:iam::<account>:role/<role>`. Anything else is returned unchanged.
pub fn rewrite_assumed_role_arn(arn: &str) -> String {
    if !arn.starts_with(STS_ARN_PREFIX) {
        return arn.to_string();
    }

    let mut parts = arn.split('/');
    let (Some(head), Some(role)) = (parts.next(), parts.next()) else {
        return arn.to_string();
    };

    match head.split(':').nth(4) {
        Some(account) if !account.is_empty() && !role.is_empty() => {
            format!("arn:aws:iam::{}:role/{}", account, role)
        }
        _ => arn.to_string(),
    }
}

fn strip_scheme(credential: &str) -> &str {
    let credential = credential.trim();
    match credential.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => credential,
    }
}

fn pad_base64(segment: &str) -> String {
    let mut padded = segment.to_string();
    let remainder = padded.len() % 4;
    if remainder != 0 {
        padded.extend(std::iter::repeat('=').take(4 - remainder));
    }
    padded
}
