//! CLI error handling with user-friendly messages.

use opentopo_dem::{DemError, ValidationError};
use std::path::PathBuf;
use std::process;
use thiserror::Error;

/// Errors surfaced by the `opentopo` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be read.
    #[error("Failed to read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for a request.
    #[error("Failed to parse config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The DEM request failed.
    #[error(transparent)]
    Dem(#[from] DemError),

    /// Output file could not be written.
    #[error("Failed to write {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// Print the error with any hints and exit with status 1.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Dem(DemError::Validation(ValidationError::MissingParameters { .. })) => {
                eprintln!();
                eprintln!("Provide the bounding box with --south, --north, --west and --east,");
                eprintln!("and the API key with --api-key or OPENTOPOGRAPHY_API_KEY.");
            }
            CliError::Dem(DemError::Remote { status: 401 | 403, .. }) => {
                eprintln!();
                eprintln!("Check that your OpenTopography API key is valid:");
                eprintln!("  https://portal.opentopography.org/myopentopo");
            }
            CliError::Dem(DemError::Network { timed_out: true, .. }) => {
                eprintln!();
                eprintln!("Large areas can take a while to generate; try a longer --timeout.");
            }
            _ => {}
        }

        process::exit(1)
    }
}
