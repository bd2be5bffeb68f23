//! Manual reading handlers.

use crate::cli::{GlobalOpts, ReadingsArgs, ReadingsCommand};
use crate::client::ApiClient;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    client: &ApiClient,
    args: ReadingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ReadingsCommand::Add {
            session,
            device,
            inc,
            ts,
        } => {
            if inc <= 0 {
                return Err(CliError::Validation {
                    field: "inc".into(),
                    reason: "must be greater than zero".into(),
                });
            }
            let ack = client
                .add_reading(session, &device, inc, ts.as_deref())
                .await?;
            let out = output::render_single(
                &global.output,
                &ack,
                |a| format!("Recorded +{} on session {}", a.inc, a.sessao_id),
                |a| a.sessao_id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
