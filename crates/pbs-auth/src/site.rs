//! Claimed-origin to canonical-site normalization.
//!
//! Two claimed origins are the same site when they share a registrable
//! domain. Scheme, port, path and extra subdomain labels are dropped and the
//! result is always reported under `https://`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;

const HTTPS_PREFIX: &str = "https://";
const HTTP_PREFIX: &str = "http://";

/// `https://<registrable-domain>`, the only form used for site comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalSite(String);

impl CanonicalSite {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Registrable domain without the scheme.
    pub fn domain(&self) -> &str {
        &self.0[HTTPS_PREFIX.len()..]
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalSite {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a claimed origin into its canonical site.
///
/// The host is cut at the first `:` and then at the first `/`, in that
/// order, so any colon (including one inside an IPv6 literal) ends the host.
pub fn normalize(claimed_origin: &str) -> Result<CanonicalSite, NormalizeError> {
    let rest = claimed_origin
        .strip_prefix(HTTP_PREFIX)
        .or_else(|| claimed_origin.strip_prefix(HTTPS_PREFIX))
        .unwrap_or(claimed_origin);

    let host = rest.split(':').next().unwrap_or_default();
    let host = host.split('/').next().unwrap_or_default();

    if host.is_empty() {
        return Err(NormalizeError::EmptyHost);
    }

    // Suffix rules are lowercase; DNS names are not case sensitive.
    let host = host.to_ascii_lowercase();

    let domain = psl::domain_str(&host).ok_or_else(|| NormalizeError::NoRegistrableDomain {
        host: host.clone(),
    })?;

    if domain.is_empty() || domain.starts_with('.') {
        return Err(NormalizeError::NoRegistrableDomain { host });
    }

    Ok(CanonicalSite(format!("{}{}", HTTPS_PREFIX, domain)))
}

/// Whether `site` is already in canonical form.
pub fn is_canonical(site: &str) -> bool {
    site.starts_with(HTTPS_PREFIX)
        && normalize(site)
            .map(|canonical| canonical.as_str() == site)
            .unwrap_or(false)
}
