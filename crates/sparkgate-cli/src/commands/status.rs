//! `sparkcli status <id>`

use std::path::PathBuf;

use clap::Args;

use super::emit;
use crate::client::GatewayClient;
use crate::Result;

/// Get the status of a submission
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Submission id
    pub id: String,

    /// Also write the response to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: StatusArgs, client: &GatewayClient) -> Result<()> {
    let (response, _) = client.status(&args.id).await?;
    emit(&response, args.output.as_deref())
}
