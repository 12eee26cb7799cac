// Error types for the harness.
// Only configuration problems are fatal; everything raised while building or
// measuring is absorbed into the registry or the sample set.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Fatal errors: the run cannot start or a named target does not exist.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Benchmark '{name}' not found in {}", root.display())]
    SuiteNotFound { name: String, root: PathBuf },

    #[error("Config file {} not found", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("Invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to encode JSON report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why the native binary could not be produced.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build command is empty")]
    EmptyCommand,

    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("build succeeded but {} is missing", path.display())]
    MissingArtifact { path: PathBuf },
}

impl BuildError {
    /// Captured diagnostic output of the build, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            BuildError::Failed { stderr, .. } if !stderr.is_empty() => Some(stderr),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
