//! Statement text shown to the operator before changes are applied.
//!
//! Execution itself goes through [`AllowlistDb`](crate::db::AllowlistDb) with
//! bound parameters; this text is for review only.

use crate::plan::AllowlistRow;
use crate::state::{IDENTITY_COLUMN, SITES_COLUMN};

/// `DELETE FROM <table> WHERE AccountId IN ('a','b');`
pub fn render_delete(table: &str, rows: &[AllowlistRow]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }

    let ids = rows
        .iter()
        .map(|r| quote(&r.account_id))
        .collect::<Vec<_>>()
        .join(",");

    Some(format!(
        "DELETE FROM {} WHERE {} IN ({});",
        table, IDENTITY_COLUMN, ids
    ))
}

/// `INSERT INTO <table> (AccountId,AdtechSites) VALUES ('a',['s1', 's2']),('b',['s3']);`
pub fn render_insert(table: &str, rows: &[AllowlistRow]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }

    let values = rows
        .iter()
        .map(|r| {
            let sites = r.sites.iter().map(|s| quote(s)).collect::<Vec<_>>();
            format!("({},[{}])", quote(&r.account_id), sites.join(", "))
        })
        .collect::<Vec<_>>()
        .join(",");

    Some(format!(
        "INSERT INTO {} ({},{}) VALUES {};",
        table, IDENTITY_COLUMN, SITES_COLUMN, values
    ))
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
