use std::io::Read;
use std::path::Path;

use anyhow::Context;
use pbs_auth::{
    cloud_function, lambda, AuthorizationEngine, EngineOptions, FunctionRequest, HandlerKind,
    StoreBackend, StoreConfig,
};

use crate::cli::args::{AuthorizeArgs, Kind};
use crate::exit_codes;

pub async fn run(args: AuthorizeArgs) -> anyhow::Result<i32> {
    let (store_config, options) = store_config(&args);

    let store = pbs_auth::connect(&store_config).context("failed to set up lookup store")?;
    let event = read_event(&args.event)?;

    let kind = match args.kind {
        Kind::Lambda => HandlerKind::Lambda,
        Kind::CloudFunction => HandlerKind::CloudFunction,
    };
    let engine = AuthorizationEngine::new(kind, store, options);

    let (output, status) = match kind {
        HandlerKind::Lambda => {
            let response = lambda::handle(&engine, &event).await;
            (serde_json::to_string_pretty(&response)?, response.status_code)
        }
        HandlerKind::CloudFunction => {
            let request: FunctionRequest = serde_json::from_value(event)
                .context("event is not a function request ({\"headers\": {...}})")?;
            let response = cloud_function::handle(&engine, &request).await;
            (serde_json::to_string_pretty(&response)?, response.status_code)
        }
    };

    println!("{}", output);

    Ok(if status == 200 {
        exit_codes::SUCCESS
    } else {
        exit_codes::FORBIDDEN
    })
}

/// Flags and their `PBS_AUTH_*` fallbacks, already resolved by clap.
fn store_config(args: &AuthorizeArgs) -> (StoreConfig, EngineOptions) {
    let backend = match (&args.store_url, &args.db) {
        (Some(url), _) => StoreBackend::Http { url: url.clone() },
        (None, Some(path)) => StoreBackend::Sqlite { path: path.clone() },
        (None, None) => StoreBackend::None,
    };

    let store = StoreConfig {
        backend,
        origin_table: args.origin_table.clone(),
        sites_table: args.sites_table.clone(),
        timeout_secs: args.store_timeout,
    };
    let options = EngineOptions {
        add_failure_stage_context: args.stage_context,
    };
    (store, options)
}

fn read_event(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };

    serde_json::from_str(&raw).context("event is not valid JSON")
}
