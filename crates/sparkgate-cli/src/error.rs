//! Error types for the CLI

use std::path::PathBuf;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("got bad response status {status} from {url}, response body: {body}")]
    BadStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("no credential found: {message}")]
    CredentialNotFound { message: String },

    #[error("lock file {path} is held by another process")]
    Locked { path: PathBuf },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("command failed: {message}")]
    CommandFailed { message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn command_failed(message: impl Into<String>) -> Self {
        Error::CommandFailed {
            message: message.into(),
        }
    }

    pub fn credential_not_found(message: impl Into<String>) -> Self {
        Error::CredentialNotFound {
            message: message.into(),
        }
    }

    /// 4xx responses; retrying them will not help
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::BadStatus { status, .. } if (400..500).contains(status))
    }
}
