//! Command-line and environment configuration.
//!
//! Every option can also be set through a `HEURIST_*` environment variable;
//! an explicit flag wins over the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use journal::JournalConfig;

/// Remote control plane for hyper-heuristic search sessions.
#[derive(Debug, Parser)]
#[command(name = "heurist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP control plane
    Serve(ServeArgs),
    /// Create a session on a running control plane and print its id
    Create(CreateArgs),
    /// Start a new instrumentation log epoch on a running control plane
    Rotate(RemoteArgs),
    /// Report whether a control plane is up and how many sessions it holds
    Health(RemoteArgs),
}

/// Diagnostic logging and tracing export.
#[derive(Debug, Args)]
pub struct LoggingArgs {
    /// Log filter directive (trace, debug, info, warn, error, or an `EnvFilter` expression)
    #[arg(long, env = "HEURIST_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Log line format
    #[arg(
        long,
        env = "HEURIST_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text,
        global = true
    )]
    pub log_format: LogFormat,

    /// OTLP gRPC endpoint for span export; export is off when unset
    #[arg(long, env = "HEURIST_OTLP_ENDPOINT", global = true)]
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "HEURIST_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Directory receiving instrumentation log files
    #[arg(long, env = "HEURIST_JOURNAL_DIR", default_value = ".")]
    pub journal_dir: PathBuf,

    /// Leading component of instrumentation log file names
    #[arg(long, env = "HEURIST_JOURNAL_PREFIX", default_value = journal::DEFAULT_PREFIX)]
    pub journal_prefix: String,

    /// Salt mixed into every session id digest
    #[arg(long, env = "HEURIST_ID_SALT", default_value = control::identity::DEFAULT_SALT)]
    pub id_salt: String,

    /// Register the deterministic stand-in domain for every problem kind
    #[arg(long, env = "HEURIST_STUB_DOMAINS")]
    pub stub_domains: bool,
}

impl ServeArgs {
    pub fn journal_config(&self) -> JournalConfig {
        JournalConfig {
            directory: self.journal_dir.clone(),
            prefix: self.journal_prefix.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct RemoteArgs {
    /// Base URL of the control plane
    #[arg(long, env = "HEURIST_URL", default_value = "http://127.0.0.1:8080")]
    pub url: String,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Problem domain kind (BinPacking, FlowShop, PersonnelScheduling, SAT, TSP, VRP)
    pub kind: String,

    /// Seed for the new session
    #[arg(allow_negative_numbers = true)]
    pub seed: i64,

    #[command(flatten)]
    pub remote: RemoteArgs,
}
