//! Session command handlers.

use tabled::Tabled;

use linecount_core::{SessionDetail, SessionSummary};

use crate::cli::{GlobalOpts, SessionsArgs, SessionsCommand};
use crate::client::{ApiClient, CreateSession};
use crate::error::CliError;
use crate::output;

use super::time_or_dash;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "Ended")]
    ended: String,
    #[tabled(rename = "Total")]
    total: i64,
}

impl From<&SessionSummary> for SessionRow {
    fn from(s: &SessionSummary) -> Self {
        Self {
            id: s.id.to_string(),
            status: s.status.to_string(),
            client: s.client.clone().unwrap_or_else(|| "-".into()),
            product: s.product.clone().unwrap_or_else(|| "-".into()),
            started: time_or_dash(Some(s.started_at)),
            ended: time_or_dash(s.ended_at),
            total: s.total,
        }
    }
}

fn detail(d: &SessionDetail) -> String {
    let s = &d.session;
    let mut lines = vec![
        format!("ID:        {}", s.id),
        format!("Status:    {}", s.status),
        format!("Client:    {}", s.client_id),
        format!("Product:   {}", s.product_id),
        format!("Operator:  {}", s.operator_id),
        format!("Lot:       {}", s.lot),
        format!("Started:   {}", time_or_dash(Some(s.started_at))),
        format!("Ended:     {}", time_or_dash(s.ended_at)),
        format!("Total:     {}", d.total),
    ];
    if !d.recent_readings.is_empty() {
        lines.push(String::new());
        lines.push("Latest readings:".into());
        for r in &d.recent_readings {
            lines.push(format!(
                "  {}  +{}",
                r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                r.increment
            ));
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &ApiClient,
    args: SessionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SessionsCommand::Create {
            client: client_id,
            product,
            operator,
            device,
            lot,
        } => {
            let created = client
                .create_session(&CreateSession {
                    cliente_id: client_id,
                    produto_id: product,
                    operador_id: operator,
                    dispositivo_codigo: device,
                    lote: lot,
                })
                .await?;
            let out = output::render_single(
                &global.output,
                &created,
                |c| format!("Session {} started", c.sessao_id),
                |c| c.sessao_id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SessionsCommand::Finalize { id, device } => {
            client.finalize_session(id, &device).await?;
            if !global.quiet {
                eprintln!("Session {id} finalized");
            }
            Ok(())
        }

        SessionsCommand::Show { id } => {
            let session = client.session(id).await?;
            let out = output::render_single(&global.output, &session, detail, |d| {
                d.session.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SessionsCommand::List { page, size } => {
            let page = client.sessions(page, size).await?;
            let out = output::render_list(
                &global.output,
                &page.rows,
                |s| SessionRow::from(s),
                |s| s.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
