//! ---
//! cs_section: "04-reconciliation"
//! cs_subsection: "module"
//! cs_type: "source"
//! cs_scope: "code"
//! cs_description: "Error taxonomy for external commands and lifecycle operations."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::time::Duration;

use cs_cib::CibError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

/// A control command that ran but exited unsuccessfully, with everything it printed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{command}` {}: {}", describe_status(.status), .stderr.trim())]
pub struct CommandError {
    pub command: String,
    /// Exit code, `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_owned(),
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Cib(#[from] CibError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("configuration update rejected: {0}")]
    Flush(#[source] CommandError),
    #[error("stopping `{target}` failed; delete was not attempted: {source}")]
    Sequencing {
        target: String,
        #[source]
        source: CommandError,
    },
    #[error("primitive request is missing mandatory field `{0}`")]
    MissingField(&'static str),
    #[error("no staged primitive named `{0}`")]
    NotStaged(String),
    #[error("unable to stage configuration update: {0}")]
    Staging(#[source] std::io::Error),
    #[error("unable to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cluster did not become ready within {0:?}")]
    NotReady(Duration),
    #[error("invalid manifest: {0}")]
    ManifestSyntax(#[from] toml::de::Error),
    #[error("manifest entry `{name}`: {reason}")]
    Manifest { name: String, reason: String },
}

impl ProviderError {
    /// The failed command behind this error, if any.
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            ProviderError::Command(err)
            | ProviderError::Flush(err)
            | ProviderError::Sequencing { source: err, .. } => Some(err),
            _ => None,
        }
    }
}
