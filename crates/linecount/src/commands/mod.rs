//! Command dispatch: bridges CLI args -> control API calls -> output formatting.

pub mod catalog;
pub mod config_cmd;
pub mod readings;
pub mod serve;
pub mod sessions;

use std::time::Duration;

use crate::cli::{Command, GlobalOpts};
use crate::client::ApiClient;
use crate::error::CliError;

/// Dispatch a client command against the control API at `--api-url`.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let client = ApiClient::new(&global.api_url, Duration::from_secs(global.timeout))?;
    tracing::debug!(api = %client.base_url(), "using control API");

    match cmd {
        Command::Sessions(args) => sessions::handle(&client, args, global).await,
        Command::Readings(args) => readings::handle(&client, args, global).await,
        Command::Catalog(args) => catalog::handle(&client, args, global).await,
        Command::Serve(_) | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Internal("command is not a client command".into()))
        }
    }
}

/// Render an optional timestamp for tables, `-` when absent.
pub(crate) fn time_or_dash(ts: Option<chrono::DateTime<chrono::Utc>>) -> String {
    ts.map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}
