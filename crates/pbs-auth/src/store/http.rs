//! HTTP-backed lookup store.
//!
//! This is the only place that interprets store status codes.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::LookupStore;
use crate::error::{StoreError, StoreResult};

const USER_AGENT_VALUE: &str = concat!("pbs-auth/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct OriginRecord {
    reporting_origin: String,
}

#[derive(Debug, Deserialize)]
struct SitesRecord {
    adtech_sites: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpStore {
    pub fn new(base_url: Url, timeout: Duration) -> StoreResult<Self> {
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Config {
                message: format!("store url cannot be a base: {}", base_url),
            });
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| StoreError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, base_url })
    }

    /// `{base}/{collection}/{identity}` with the identity as one encoded segment.
    fn record_url(&self, collection: &str, identity: &str) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Config {
                message: format!("store url cannot be a base: {}", self.base_url),
            })?
            .pop_if_empty()
            .push(collection)
            .push(identity);
        Ok(url)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        identity: &str,
    ) -> StoreResult<T> {
        let url = self.record_url(collection, identity)?;
        debug!(collection, "fetching authorization record");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => response.json().await.map_err(|e| {
                if e.is_timeout() {
                    StoreError::from(e)
                } else {
                    StoreError::Backend {
                        message: format!("failed to parse {} record: {}", collection, e),
                        status: None,
                    }
                }
            }),

            404 => Err(StoreError::NotFound {
                identity: identity.to_string(),
            }),

            429 | 503 | 504 => {
                let message = response.text().await.unwrap_or_default();
                Err(StoreError::Unavailable {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }

            code => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| status.to_string());
                Err(StoreError::Backend {
                    message: format!("HTTP {}: {}", code, message),
                    status: Some(code),
                })
            }
        }
    }
}

#[async_trait]
impl LookupStore for HttpStore {
    async fn get_registered_origin(&self, identity: &str) -> StoreResult<String> {
        self.fetch::<OriginRecord>("origins", identity)
            .await
            .map(|r| r.reporting_origin)
    }

    async fn get_registered_sites(&self, identity: &str) -> StoreResult<BTreeSet<String>> {
        self.fetch::<SitesRecord>("sites", identity)
            .await
            .map(|r| r.adtech_sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> HttpStore {
        HttpStore::new(Url::parse(base).unwrap(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn identity_is_one_encoded_segment() {
        let store = store("https://store.internal/v1/");
        let url = store
            .record_url("origins", "arn:aws:iam::123456789012:role/demo")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://store.internal/v1/origins/arn:aws:iam::123456789012:role%2Fdemo"
        );
    }

    #[test]
    fn base_without_trailing_slash() {
        let store = store("https://store.internal/v1");
        let url = store.record_url("sites", "a@b.com").unwrap();
        assert_eq!(url.as_str(), "https://store.internal/v1/sites/a@b.com");
    }

    #[test]
    fn rejects_non_base_url() {
        let url = Url::parse("mailto:ops@example.com").unwrap();
        assert!(HttpStore::new(url, Duration::from_secs(1)).is_err());
    }
}
