//! `sparkcli kill <id>`

use clap::Args;
use tracing::info;

use crate::client::GatewayClient;
use crate::Result;

/// Stop a submission's driver and executors, keeping its record
#[derive(Args, Debug)]
pub struct KillArgs {
    /// Submission id
    pub id: String,
}

pub async fn run(args: KillArgs, client: &GatewayClient) -> Result<()> {
    let (response, _) = client.kill(&args.id).await?;
    info!(submission = %args.id, "Killed");
    println!("{}", response);
    Ok(())
}
