//! Error types for the spawner

use std::fmt;

use thiserror::Error;

/// Main error type for the spawner
#[derive(Error, Debug)]
pub enum SpawnerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("config file error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("discovery error: {0}")]
    DiscoveryError(String),

    #[error("grid error: {0}")]
    GridError(String),

    #[error("deployment failed: {0}")]
    DeployError(ErrorStack),

    #[error("deployment failed after {attempts} attempts: {errors}")]
    RetriesExhausted { attempts: u32, errors: ErrorStack },

    #[error("cleanup failed: {0}")]
    CleanupError(ErrorStack),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for SpawnerError {
    fn from(err: anyhow::Error) -> Self {
        SpawnerError::Internal(err.to_string())
    }
}

/// Accumulates the per-item and per-attempt errors of partial batch failures.
///
/// Pushing a `DeployError` flattens its inner stack, so nesting aggregated
/// errors across retry attempts keeps every cause visible at the top level.
#[derive(Debug, Default)]
pub struct ErrorStack {
    errors: Vec<SpawnerError>,
}

impl ErrorStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error, flattening already-aggregated deployment errors
    pub fn push(&mut self, err: SpawnerError) {
        match err {
            SpawnerError::DeployError(stack) => self.errors.extend(stack.errors),
            other => self.errors.push(other),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpawnerError> {
        self.errors.iter()
    }
}

impl fmt::Display for ErrorStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => write!(f, "no errors"),
            1 => write!(f, "1 error occurred: {}", self.errors[0]),
            n => {
                write!(f, "{} errors occurred: ", n)?;
                for (i, err) in self.errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}
