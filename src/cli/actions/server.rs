use crate::{api, cli::telemetry, gate::GateOptions};
use anyhow::Result;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub options: GateOptions,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    debug!("gate options: {:?}", args.options);

    let result = api::new(args.port, args.options).await;

    telemetry::shutdown_tracer();

    result
}
