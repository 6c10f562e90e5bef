//! `sparkcli log <id>`

use clap::Args;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

use super::CommandErrorExt;
use crate::client::GatewayClient;
use crate::Result;

/// Print the driver or an executor log
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Submission id
    pub id: String,

    /// Executor number; the driver log when negative
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    pub executor: i64,

    /// Keep streaming as the log grows
    #[arg(short, long)]
    pub follow: bool,
}

pub async fn run(args: LogArgs, client: &GatewayClient) -> Result<()> {
    let stream = client.log(&args.id, args.executor, args.follow).await?;
    let mut reader = StreamReader::new(Box::pin(stream));
    let mut stdout = tokio::io::stdout();

    tokio::io::copy(&mut reader, &mut stdout).await.cmd_err()?;
    stdout.flush().await.cmd_err()?;
    Ok(())
}
