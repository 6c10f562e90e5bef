//! `sparkcli delete <id>`

use clap::Args;
use tracing::info;

use crate::client::GatewayClient;
use crate::Result;

/// Delete a submission and everything it started
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Submission id
    pub id: String,
}

pub async fn run(args: DeleteArgs, client: &GatewayClient) -> Result<()> {
    let (response, _) = client.delete(&args.id).await?;
    info!(submission = %args.id, "Deleted");
    println!("{}", response);
    Ok(())
}
