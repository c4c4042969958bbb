//! Allowlist table writes.

use std::path::{Path, PathBuf};

use pbs_auth::config::validate_table_name;
use pbs_auth::store::sqlite::{encode_sites, table_exists, IDENTITY_COLUMN, SITES_COLUMN};
use rusqlite::{params, Connection, OpenFlags};
use tracing::info;

use crate::error::{OnboardingError, OnboardingResult};
use crate::plan::AllowlistRow;

/// Database holding the per-site authorization table.
pub trait AllowlistDb {
    /// Table the statements target.
    fn table(&self) -> &str;

    /// Fails with [`OnboardingError::MissingResource`] when the database or
    /// table is not there.
    fn resources_exist(&self) -> OnboardingResult<()>;

    /// Delete `removals` then insert `additions`, atomically.
    fn apply(&mut self, removals: &[AllowlistRow], additions: &[AllowlistRow])
        -> OnboardingResult<()>;
}

pub struct SqliteAllowlistDb {
    path: PathBuf,
    conn: Option<Connection>,
    table: String,
}

impl std::fmt::Debug for SqliteAllowlistDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAllowlistDb")
            .field("path", &self.path)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl SqliteAllowlistDb {
    /// Open an existing database. A missing file is reported by
    /// [`resources_exist`](AllowlistDb::resources_exist), not here.
    pub fn open(path: &Path, table: &str) -> OnboardingResult<Self> {
        validate_table_name(table).map_err(|_| OnboardingError::InvalidTableName {
            name: table.to_string(),
        })?;

        let conn = if path.is_file() {
            Some(Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?)
        } else {
            None
        };

        Ok(Self {
            path: path.to_path_buf(),
            conn,
            table: table.to_string(),
        })
    }

    fn conn_mut(&mut self) -> OnboardingResult<&mut Connection> {
        let path = self.path.display().to_string();
        self.conn
            .as_mut()
            .ok_or(OnboardingError::MissingResource {
                kind: "database",
                name: path,
            })
    }
}

impl AllowlistDb for SqliteAllowlistDb {
    fn table(&self) -> &str {
        &self.table
    }

    fn resources_exist(&self) -> OnboardingResult<()> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| OnboardingError::MissingResource {
                kind: "database",
                name: self.path.display().to_string(),
            })?;

        if !table_exists(conn, &self.table)? {
            return Err(OnboardingError::MissingResource {
                kind: "table",
                name: self.table.clone(),
            });
        }
        Ok(())
    }

    fn apply(
        &mut self,
        removals: &[AllowlistRow],
        additions: &[AllowlistRow],
    ) -> OnboardingResult<()> {
        let delete = format!("DELETE FROM {} WHERE {} = ?1", self.table, IDENTITY_COLUMN);
        let insert = format!(
            "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
            self.table, IDENTITY_COLUMN, SITES_COLUMN
        );

        let tx = self.conn_mut()?.transaction()?;
        {
            let mut stmt = tx.prepare(&delete)?;
            for row in removals {
                stmt.execute(params![row.account_id])?;
            }

            let mut stmt = tx.prepare(&insert)?;
            for row in additions {
                stmt.execute(params![row.account_id, encode_sites(&row.sites)])?;
            }
        }
        tx.commit()?;

        info!(
            removed = removals.len(),
            added = additions.len(),
            "allowlist table updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbs_auth::store::sqlite::init_database;

    fn row(account: &str, sites: &[&str]) -> AllowlistRow {
        AllowlistRow {
            account_id: account.to_string(),
            sites: sites.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn sites_for(path: &Path, account: &str) -> Option<String> {
        let conn = Connection::open(path).unwrap();
        conn.query_row(
            "SELECT AdtechSites FROM AdtechSitesAuth WHERE AccountId = ?1",
            params![account],
            |r| r.get(0),
        )
        .ok()
    }

    #[test]
    fn missing_database_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.db");
        let db = SqliteAllowlistDb::open(&path, "AdtechSitesAuth").unwrap();
        assert!(matches!(
            db.resources_exist(),
            Err(OnboardingError::MissingResource {
                kind: "database",
                ..
            })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn missing_table_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.db");
        init_database(&path, "ReportingOriginAuth", "AdtechSitesAuth").unwrap();

        let db = SqliteAllowlistDb::open(&path, "OtherTable").unwrap();
        assert!(matches!(
            db.resources_exist(),
            Err(OnboardingError::MissingResource { kind: "table", .. })
        ));
    }

    #[test]
    fn bad_table_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SqliteAllowlistDb::open(&dir.path().join("auth.db"), "T; DROP"),
            Err(OnboardingError::InvalidTableName { .. })
        ));
    }

    #[test]
    fn apply_replaces_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.db");
        init_database(&path, "ReportingOriginAuth", "AdtechSitesAuth").unwrap();

        let mut db = SqliteAllowlistDb::open(&path, "AdtechSitesAuth").unwrap();
        db.resources_exist().unwrap();
        db.apply(&[], &[row("ccc@email.com", &["https://domain-c.com"])])
            .unwrap();
        db.apply(
            &[row("ccc@email.com", &["https://domain-c.com"])],
            &[row(
                "ccc@email.com",
                &["https://domain-c.com", "https://domain-cc.com"],
            )],
        )
        .unwrap();

        assert_eq!(
            sites_for(&path, "ccc@email.com").as_deref(),
            Some(r#"["https://domain-c.com","https://domain-cc.com"]"#)
        );
    }

    #[test]
    fn failed_apply_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.db");
        init_database(&path, "ReportingOriginAuth", "AdtechSitesAuth").unwrap();

        let mut db = SqliteAllowlistDb::open(&path, "AdtechSitesAuth").unwrap();
        db.apply(&[], &[row("a@x.com", &["https://a.com"])]).unwrap();

        // Second insert for the same account violates the primary key.
        let err = db
            .apply(
                &[row("a@x.com", &["https://a.com"])],
                &[row("b@x.com", &["https://b.com"]), row("b@x.com", &[])],
            )
            .unwrap_err();
        assert!(matches!(err, OnboardingError::Database(_)));

        assert!(sites_for(&path, "a@x.com").is_some());
        assert!(sites_for(&path, "b@x.com").is_none());
    }
}
