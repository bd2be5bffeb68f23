//! Catalog listing handlers.

use tabled::Tabled;

use crate::cli::{CatalogArgs, CatalogCommand, GlobalOpts};
use crate::client::ApiClient;
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct NamedRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Description")]
    description: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &ApiClient,
    args: CatalogArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let out = match args.command {
        CatalogCommand::Clients => {
            let clients = client.clients().await?;
            output::render_list(
                &global.output,
                &clients,
                |c| NamedRow {
                    id: c.id,
                    name: c.name.clone(),
                },
                |c| c.id.to_string(),
            )
        }
        CatalogCommand::Products => {
            let products = client.products().await?;
            output::render_list(
                &global.output,
                &products,
                |p| NamedRow {
                    id: p.id,
                    name: p.name.clone(),
                },
                |p| p.id.to_string(),
            )
        }
        CatalogCommand::Devices => {
            let devices = client.devices().await?;
            output::render_list(
                &global.output,
                &devices,
                |d| DeviceRow {
                    id: d.id.to_string(),
                    code: d.code.clone(),
                    description: d.description.clone(),
                },
                |d| d.code.clone(),
            )
        }
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
