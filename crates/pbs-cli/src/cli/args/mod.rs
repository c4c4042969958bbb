use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pbs-auth",
    version,
    about = "Authorization handlers, allowlist onboarding and heartbeat probes for the privacy budget service"
)]
pub struct Cli {
    /// Log output format (logs are written to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one authorization request through a handler
    Authorize(AuthorizeArgs),
    /// Reconcile the allowlist CSV with the per-site authorization table
    Onboard(OnboardArgs),
    /// Probe service health endpoints
    Heartbeat(HeartbeatArgs),
    /// Lookup database maintenance
    Db(DbArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    Lambda,
    CloudFunction,
}

#[derive(Args, Debug, Clone)]
pub struct AuthorizeArgs {
    /// Handler runtime to emulate
    #[arg(long, value_enum)]
    pub kind: Kind,

    /// Request event as JSON (`-` reads stdin)
    #[arg(long, default_value = "-")]
    pub event: PathBuf,

    /// SQLite lookup store
    #[arg(long, env = "PBS_AUTH_SQLITE_PATH")]
    pub db: Option<PathBuf>,

    /// HTTP lookup store base URL (wins over --db)
    #[arg(long, env = "PBS_AUTH_STORE_URL")]
    pub store_url: Option<url::Url>,

    /// Single-origin table
    #[arg(long, env = "PBS_AUTH_ORIGIN_TABLE", default_value = pbs_auth::config::DEFAULT_ORIGIN_TABLE)]
    pub origin_table: String,

    /// Per-site table
    #[arg(long, env = "PBS_AUTH_SITES_TABLE", default_value = pbs_auth::config::DEFAULT_SITES_TABLE)]
    pub sites_table: String,

    /// HTTP lookup store timeout in seconds
    #[arg(
        long,
        env = "PBS_AUTH_STORE_TIMEOUT",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub store_timeout: u64,

    /// Include the failing stage in forbidden responses
    #[arg(
        long,
        env = "PBS_AUTH_ADD_FAILURE_STAGE_CONTEXT",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub stage_context: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OnboardArgs {
    /// Directory holding the remote state (the state bucket)
    pub bucket_dir: PathBuf,

    /// State object name inside the bucket, e.g. auth_states/prod/allowed_ids
    pub state_file_name: String,

    /// Local CSV holding the desired allowlist
    pub desired_csv: PathBuf,

    /// SQLite database holding the allowlist table
    #[arg(long)]
    pub db: PathBuf,

    /// Allowlist table name
    #[arg(long, default_value = pbs_auth::config::DEFAULT_SITES_TABLE)]
    pub table: String,

    /// Apply without asking for confirmation
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct HeartbeatArgs {
    /// Endpoints to probe; a bare host URL probes /health
    #[arg(required = true)]
    pub endpoints: Vec<url::Url>,

    /// Probe rounds
    #[arg(long, default_value_t = 1)]
    pub count: u32,

    /// Seconds between rounds
    #[arg(long, default_value_t = 30)]
    pub interval_secs: u64,

    /// Per-probe timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct DbArgs {
    #[command(subcommand)]
    pub cmd: DbSub,
}

#[derive(Subcommand, Debug, Clone)]
pub enum DbSub {
    /// Create the lookup tables if they are missing
    Init(DbInitArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DbInitArgs {
    #[arg(long)]
    pub db: PathBuf,

    #[arg(long, default_value = pbs_auth::config::DEFAULT_ORIGIN_TABLE)]
    pub origin_table: String,

    #[arg(long, default_value = pbs_auth::config::DEFAULT_SITES_TABLE)]
    pub sites_table: String,
}
