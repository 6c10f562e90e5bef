//! sparkcli library
//!
//! Client for the sparkgate submission gateway. The gateway URL and basic
//! credentials come from the command line or from `~/.sparkcli/config`.

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod filelock;

pub use error::{Error, Result};

use clap::{Args, Parser, Subcommand};

use crate::client::GatewayClient;
use crate::config::{default_config_path, resolve_credential, CredentialArgs};

/// sparkcli - submit and manage Spark applications through the gateway
#[derive(Parser, Debug)]
#[command(name = "sparkcli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Gateway connection options, accepted by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Gateway API url, e.g. http://server:port/sparkapi/v1
    #[arg(short = 'l', long, global = true)]
    pub url: Option<String>,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long, global = true)]
    pub insecure: bool,

    #[arg(short = 'u', long, global = true)]
    pub user: Option<String>,

    #[arg(short = 'p', long, global = true)]
    pub password: Option<String>,

    /// Neither read nor update ~/.sparkcli/config
    #[arg(long, global = true)]
    pub ignore_credential_cache: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a Spark application
    Submit(commands::submit::SubmitArgs),
    /// Get the status of a submission
    Status(commands::status::StatusArgs),
    /// Delete a submission
    Delete(commands::delete::DeleteArgs),
    /// Stop a submission's pods, keeping its record
    Kill(commands::kill::KillArgs),
    /// List submissions
    List(commands::list::ListArgs),
    /// Print the driver or an executor log
    Log(commands::log::LogArgs),
    /// Upload a local file
    Upload(commands::upload::UploadArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        let client = self.connection.connect().await?;

        match self.command {
            Commands::Submit(args) => commands::submit::run(args, &client).await,
            Commands::Status(args) => commands::status::run(args, &client).await,
            Commands::Delete(args) => commands::delete::run(args, &client).await,
            Commands::Kill(args) => commands::kill::run(args, &client).await,
            Commands::List(args) => commands::list::run(args, &client).await,
            Commands::Log(args) => commands::log::run(args, &client).await,
            Commands::Upload(args) => commands::upload::run(args, &client).await,
        }
    }
}

impl ConnectionArgs {
    /// Resolve credentials and build a client
    pub async fn connect(&self) -> Result<GatewayClient> {
        let store = if self.ignore_credential_cache {
            None
        } else {
            Some(default_config_path()?)
        };
        let credential = resolve_credential(
            &CredentialArgs {
                url: self.url.clone(),
                user: self.user.clone(),
                password: self.password.clone(),
            },
            store.as_deref(),
        )
        .await?;
        GatewayClient::new(&credential, self.insecure)
    }
}
