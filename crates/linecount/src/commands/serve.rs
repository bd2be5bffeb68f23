//! `serve`: run the control API and device ingestion.

use crate::cli::{GlobalOpts, ServeArgs};
use crate::error::CliError;
use crate::server;

use super::config_cmd;

pub async fn handle(args: ServeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = config_cmd::load(global)?;
    if let Some(bind) = args.bind {
        config.http.bind = bind;
    }
    if let Some(database) = args.database {
        config.database.path = database;
    }
    config.validate()?;

    tracing::info!(
        namespace = %config.namespace().prefix(),
        mqtt = %format!("{}:{}", config.mqtt.host, config.mqtt.port),
        "starting linecount"
    );
    server::serve(&config).await
}
