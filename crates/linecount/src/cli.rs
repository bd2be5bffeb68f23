//! Clap derive structures for the `linecount` binary.
//!
//! `serve` runs the control API and ingestion loop; everything else is an
//! operator client talking to a running control API.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// linecount -- production-line session tracker
#[derive(Debug, Parser)]
#[command(
    name = "linecount",
    version,
    about = "Track production sessions and device counts on a factory line",
    long_about = "Runs the control API and MQTT ingestion for a production line (`serve`),\n\
        and operates a running instance from the command line.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "LINECOUNT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Control API base URL for client commands
    #[arg(
        long,
        env = "LINECOUNT_API_URL",
        default_value = "http://127.0.0.1:5000",
        global = true
    )]
    pub api_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "LINECOUNT_TIMEOUT", default_value = "10", global = true)]
    pub timeout: u64,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LINECOUNT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Log Enums ───────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the control API and device ingestion
    Serve(ServeArgs),

    /// Create, finalize and inspect production sessions
    #[command(alias = "s")]
    Sessions(SessionsArgs),

    /// Record counter readings manually
    #[command(alias = "r")]
    Readings(ReadingsArgs),

    /// List clients, products and devices
    Catalog(CatalogArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Serve ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address (overrides http.bind)
    #[arg(long)]
    pub bind: Option<String>,

    /// Database file (overrides database.path)
    #[arg(long)]
    pub database: Option<PathBuf>,
}

// ── Sessions ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    /// Start a session and send `start` to its device
    Create {
        /// Client id
        #[arg(long)]
        client: i64,
        /// Product id
        #[arg(long)]
        product: i64,
        /// Operator id
        #[arg(long)]
        operator: i64,
        /// Device code
        #[arg(long)]
        device: String,
        /// Lot label
        #[arg(long)]
        lot: Option<String>,
    },

    /// Finalize a session and send `stop` to the device
    Finalize {
        /// Session id
        id: i64,
        /// Device code
        #[arg(long)]
        device: String,
    },

    /// Show one session with its total and latest readings
    #[command(alias = "get")]
    Show {
        /// Session id
        id: i64,
    },

    /// List sessions, newest first
    #[command(alias = "ls")]
    List {
        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: i64,
        /// Page size (max 100)
        #[arg(long, default_value = "20")]
        size: i64,
    },
}

// ── Readings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReadingsArgs {
    #[command(subcommand)]
    pub command: ReadingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReadingsCommand {
    /// Append one increment to a session
    Add {
        /// Session id
        #[arg(long)]
        session: i64,
        /// Device code
        #[arg(long)]
        device: String,
        /// Increment (> 0)
        #[arg(long)]
        inc: i64,
        /// Reading time (ISO-8601); defaults to now on the server
        #[arg(long)]
        ts: Option<String>,
    },
}

// ── Catalog ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// Registered clients
    Clients,
    /// Registered products
    Products,
    /// Registered devices
    #[command(alias = "dev")]
    Devices,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (secrets masked)
    Show,
    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
