//! `sparkcli list`

use std::path::PathBuf;

use clap::Args;

use super::emit;
use crate::client::GatewayClient;
use crate::Result;

/// List submissions
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Maximum number of submissions the server returns
    #[arg(long)]
    pub limit: Option<u32>,

    /// Only list submissions in this state
    #[arg(long)]
    pub state: Option<String>,

    /// Also write the response to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: ListArgs, client: &GatewayClient) -> Result<()> {
    let (response, _) = client.list(args.limit, args.state.as_deref()).await?;
    emit(&response, args.output.as_deref())
}
