use anyhow::Context;
use pbs_auth::store::sqlite::init_database;

use crate::cli::args::DbInitArgs;
use crate::exit_codes;

pub fn cmd_db_init(args: DbInitArgs) -> anyhow::Result<i32> {
    init_database(&args.db, &args.origin_table, &args.sites_table)
        .with_context(|| format!("failed to initialize {}", args.db.display()))?;

    eprintln!(
        "Initialized {} ({}, {})",
        args.db.display(),
        args.origin_table,
        args.sites_table
    );
    Ok(exit_codes::SUCCESS)
}
