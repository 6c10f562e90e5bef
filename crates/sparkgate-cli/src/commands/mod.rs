//! CLI commands

use std::fmt::Display;
use std::path::Path;

use crate::{Error, Result};

pub mod delete;
pub mod kill;
pub mod list;
pub mod log;
pub mod status;
pub mod submit;
pub mod upload;

/// Extension trait to convert errors with Display to CLI Error::CommandFailed.
///
/// This reduces boilerplate for the common pattern of `.map_err(|e| Error::command_failed(e.to_string()))`.
pub trait CommandErrorExt<T> {
    /// Convert an error to `Error::CommandFailed` using its Display implementation.
    fn cmd_err(self) -> Result<T>;
}

impl<T, E: Display> CommandErrorExt<T> for std::result::Result<T, E> {
    fn cmd_err(self) -> Result<T> {
        self.map_err(|e| Error::command_failed(e.to_string()))
    }
}

/// Print a response and, when asked, save it to `output` as well
pub fn emit(response: &str, output: Option<&Path>) -> Result<()> {
    println!("{}", response);
    if let Some(path) = output {
        std::fs::write(path, response).map_err(|e| {
            Error::command_failed(format!(
                "failed to write output file {}: {}",
                path.display(),
                e
            ))
        })?;
    }
    Ok(())
}
