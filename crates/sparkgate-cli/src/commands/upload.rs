//! `sparkcli upload <file>`

use std::path::PathBuf;

use clap::Args;

use crate::client::GatewayClient;
use crate::Result;

/// Upload a local file and print the URL Spark can read it from
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Local file
    pub file: PathBuf,
}

pub async fn run(args: UploadArgs, client: &GatewayClient) -> Result<()> {
    let url = client.upload(&args.file).await?;
    println!("{}", url);
    Ok(())
}
