use std::time::Duration;

use crate::cli::args::HeartbeatArgs;
use crate::exit_codes;
use crate::probe::HeartbeatProbe;

pub async fn run(args: HeartbeatArgs) -> anyhow::Result<i32> {
    let timeout = Duration::from_secs(args.timeout_secs);
    let probes = args
        .endpoints
        .into_iter()
        .map(|endpoint| HeartbeatProbe::new(endpoint, timeout))
        .collect::<anyhow::Result<Vec<_>>>()?;

    tracing::info!(
        endpoints = ?probes.iter().map(|p| p.endpoint().as_str()).collect::<Vec<_>>(),
        rounds = args.count,
        "starting heartbeat"
    );

    let mut all_healthy = true;
    for round in 0..args.count.max(1) {
        if round > 0 {
            tokio::time::sleep(Duration::from_secs(args.interval_secs)).await;
        }
        for probe in &probes {
            let report = probe.check().await;
            all_healthy &= report.healthy;
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    Ok(if all_healthy {
        exit_codes::SUCCESS
    } else {
        exit_codes::UNHEALTHY
    })
}
