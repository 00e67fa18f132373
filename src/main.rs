//! esi-gate - query the EVE Swagger Interface through a cache and retry layer
//!
//! Prints each result as pretty JSON on stdout; logs go to stderr.

use std::sync::Arc;

use clap::Parser;

use esi_gate::cli::{self, Cli};
use esi_gate::error::BoxError;
use esi_gate::{logging, EsiClient, EsiConfig, ErrorBudgetTracker, RequestContext};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    logging::init(cli.json_logs)?;

    let config = cli.apply(EsiConfig::from_env()?);
    let client = EsiClient::from_config(&config, Arc::new(ErrorBudgetTracker::new())).await?;

    // Ctrl-C aborts in-flight requests and pending backoff sleeps
    let ctx = RequestContext::new();
    let cancel = ctx.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let output = cli::execute(&client, &ctx, &cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
