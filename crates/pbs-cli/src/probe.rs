//! Heartbeat probes for deployed handlers.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT_VALUE: &str = concat!("pbs-auth-heartbeat/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Outcome of a single probe, emitted as one JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub healthy: bool,
    pub latency_ms: u64,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HeartbeatProbe {
    client: reqwest::Client,
    endpoint: Url,
}

impl HeartbeatProbe {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: health_url(endpoint),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn check(&self) -> ProbeReport {
        let checked_at = Utc::now();
        let started = Instant::now();
        debug!(endpoint = %self.endpoint, "probing");

        let result = self.client.get(self.endpoint.clone()).send().await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (status, error) = match result {
            Ok(response) => {
                let status = response.status();
                let error = (!status.is_success()).then(|| format!("HTTP {}", status));
                (Some(status.as_u16()), error)
            }
            Err(e) => (None, Some(e.to_string())),
        };

        let healthy = error.is_none();
        if !healthy {
            warn!(endpoint = %self.endpoint, status = ?status, error = ?error, "probe failed");
        }

        ProbeReport {
            endpoint: self.endpoint.to_string(),
            status,
            healthy,
            latency_ms,
            checked_at,
            error,
        }
    }
}

/// A URL without a path probes the default health path.
fn health_url(mut endpoint: Url) -> Url {
    if endpoint.path().is_empty() || endpoint.path() == "/" {
        endpoint.set_path(DEFAULT_HEALTH_PATH);
    }
    endpoint
}
