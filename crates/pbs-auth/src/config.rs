use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StoreError;

pub const DEFAULT_ORIGIN_TABLE: &str = "ReportingOriginAuth";
pub const DEFAULT_SITES_TABLE: &str = "AdtechSitesAuth";

fn default_origin_table() -> String {
    DEFAULT_ORIGIN_TABLE.to_string()
}

fn default_sites_table() -> String {
    DEFAULT_SITES_TABLE.to_string()
}

fn default_timeout() -> u64 {
    10
}

/// Engine behaviour fixed at process start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Report the failing stage alongside forbidden responses.
    #[serde(default)]
    pub add_failure_stage_context: bool,
}

/// Where authorization records live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    None,
    Sqlite {
        path: PathBuf,
    },
    Http {
        url: Url,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Single-origin (v1) table.
    #[serde(default = "default_origin_table")]
    pub origin_table: String,
    /// Per-site (v2) table.
    #[serde(default = "default_sites_table")]
    pub sites_table: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::None,
            origin_table: default_origin_table(),
            sites_table: default_sites_table(),
            timeout_secs: default_timeout(),
        }
    }
}

impl StoreConfig {
    pub fn with_backend(mut self, backend: StoreBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_tables(mut self, origin: impl Into<String>, sites: impl Into<String>) -> Self {
        self.origin_table = origin.into();
        self.sites_table = sites.into();
        self
    }

    /// Table names end up in SQL text, so they must be plain identifiers.
    /// A zero timeout would fail every HTTP lookup.
    pub fn validate(&self) -> Result<(), StoreError> {
        for name in [&self.origin_table, &self.sites_table] {
            validate_table_name(name)?;
        }
        if self.timeout_secs == 0 {
            return Err(StoreError::Config {
                message: "store timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }
}

/// Full handler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub options: EngineOptions,
    #[serde(default)]
    pub store: StoreConfig,
}

impl AuthConfig {
    /// Read the `PBS_AUTH_*` variables. A value that is set but unusable is a
    /// configuration error, never a silent fallback.
    pub fn from_env() -> Result<Self, StoreError> {
        let mut cfg = Self::default();

        cfg.options.add_failure_stage_context = env::var("PBS_AUTH_ADD_FAILURE_STAGE_CONTEXT")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if let Ok(v) = env::var("PBS_AUTH_SQLITE_PATH") {
            if !v.is_empty() {
                cfg.store.backend = StoreBackend::Sqlite {
                    path: PathBuf::from(v),
                };
            }
        }

        // HTTP wins when both are set.
        if let Ok(v) = env::var("PBS_AUTH_STORE_URL") {
            if !v.is_empty() {
                let url = Url::parse(&v).map_err(|e| StoreError::Config {
                    message: format!("invalid PBS_AUTH_STORE_URL {:?}: {}", v, e),
                })?;
                cfg.store.backend = StoreBackend::Http { url };
            }
        }

        if let Ok(v) = env::var("PBS_AUTH_ORIGIN_TABLE") {
            cfg.store.origin_table = v;
        }

        if let Ok(v) = env::var("PBS_AUTH_SITES_TABLE") {
            cfg.store.sites_table = v;
        }

        if let Ok(v) = env::var("PBS_AUTH_STORE_TIMEOUT") {
            cfg.store.timeout_secs = v.trim().parse().map_err(|e| StoreError::Config {
                message: format!("invalid PBS_AUTH_STORE_TIMEOUT {:?}: {}", v, e),
            })?;
        }

        cfg.store.validate()?;
        Ok(cfg)
    }
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StoreError::Config {
            message: format!("invalid table name: {:?}", name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "PBS_AUTH_ADD_FAILURE_STAGE_CONTEXT",
        "PBS_AUTH_SQLITE_PATH",
        "PBS_AUTH_STORE_URL",
        "PBS_AUTH_ORIGIN_TABLE",
        "PBS_AUTH_SITES_TABLE",
        "PBS_AUTH_STORE_TIMEOUT",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn defaults_without_env() {
        clear_env();
        let cfg = AuthConfig::from_env().unwrap();
        assert!(!cfg.options.add_failure_stage_context);
        assert_eq!(cfg.store.backend, StoreBackend::None);
        assert_eq!(cfg.store.origin_table, DEFAULT_ORIGIN_TABLE);
        assert_eq!(cfg.store.sites_table, DEFAULT_SITES_TABLE);
        assert_eq!(cfg.store.timeout_secs, 10);
    }

    #[test]
    #[serial]
    fn reads_env() {
        clear_env();
        env::set_var("PBS_AUTH_ADD_FAILURE_STAGE_CONTEXT", "TRUE");
        env::set_var("PBS_AUTH_SQLITE_PATH", "/tmp/auth.db");
        env::set_var("PBS_AUTH_ORIGIN_TABLE", "Origins");
        env::set_var("PBS_AUTH_STORE_TIMEOUT", "3");

        let cfg = AuthConfig::from_env().unwrap();
        assert!(cfg.options.add_failure_stage_context);
        assert_eq!(
            cfg.store.backend,
            StoreBackend::Sqlite {
                path: PathBuf::from("/tmp/auth.db")
            }
        );
        assert_eq!(cfg.store.origin_table, "Origins");
        assert_eq!(cfg.store.timeout_secs, 3);

        env::set_var("PBS_AUTH_STORE_URL", "https://store.internal/v1");
        let cfg = AuthConfig::from_env().unwrap();
        assert!(matches!(cfg.store.backend, StoreBackend::Http { .. }));
        clear_env();
    }

    fn config_error() -> String {
        match AuthConfig::from_env() {
            Err(StoreError::Config { message }) => message,
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn unparsable_store_url_does_not_fall_back_to_sqlite() {
        clear_env();
        env::set_var("PBS_AUTH_SQLITE_PATH", "/tmp/x.db");
        env::set_var("PBS_AUTH_STORE_URL", "htp//typo");
        assert!(config_error().contains("PBS_AUTH_STORE_URL"));
        clear_env();
    }

    #[test]
    #[serial]
    fn non_numeric_timeout_is_rejected() {
        clear_env();
        env::set_var("PBS_AUTH_STORE_TIMEOUT", "ten");
        assert!(config_error().contains("PBS_AUTH_STORE_TIMEOUT"));
        clear_env();
    }

    #[test]
    #[serial]
    fn zero_timeout_is_rejected() {
        clear_env();
        env::set_var("PBS_AUTH_STORE_URL", "https://store.internal/v1");
        env::set_var("PBS_AUTH_STORE_TIMEOUT", "0");
        assert!(config_error().contains("timeout"));
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_table_name_in_env_is_rejected() {
        clear_env();
        env::set_var("PBS_AUTH_SITES_TABLE", "sites; --");
        assert!(config_error().contains("invalid table name"));
        clear_env();
    }

    #[test]
    fn table_names_are_identifiers() {
        assert!(validate_table_name("ReportingOriginAuth").is_ok());
        assert!(validate_table_name("_t1").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("t; DROP TABLE x").is_err());
        assert!(StoreConfig::default()
            .with_tables("ok", "not-ok")
            .validate()
            .is_err());
    }
}
