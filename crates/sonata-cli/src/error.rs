//! Error handling for the SONATA process front-end.

use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI-boundary error: unifies the network-description core's error
/// family with the configuration and process-level failures specific to
/// this binary.
#[derive(Error, Debug)]
pub enum CliError {
    /// An error raised by the network-description core.
    #[error("{0}")]
    Sonata(#[from] sonata_model::SonataError),

    /// A malformed or unreadable configuration document.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error reading a configuration or circuit-config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error surfaced at the CLI boundary.
    #[error(transparent)]
    Generic(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
