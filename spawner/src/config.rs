//! Spawner configuration
//!
//! Loaded once per command invocation from a YAML file and validated up
//! front. Invalid values are fatal before any grid call is made.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use crate::errors::SpawnerError;

fn default_max_retries() -> u32 {
    5
}

/// Failure-recovery policy applied after a partially-failed batch.
/// Unknown values are rejected when the config file is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStrategy {
    /// Return the aggregated error immediately, leave successes deployed
    Stop,

    /// Re-deploy only the failing pairs, up to `max_retries` attempts
    Retry,

    /// Cancel everything belonging to the farm, then return the error
    DestroyAll,

    /// Cancel only the failing pairs and accept the partial deployment
    DestroyFailing,
}

impl FailureStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStrategy::Stop => "stop",
            FailureStrategy::Retry => "retry",
            FailureStrategy::DestroyAll => "destroy-all",
            FailureStrategy::DestroyFailing => "destroy-failing",
        }
    }
}

/// Spawner configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Farms targeted by spawn, list and destroy
    pub farms: Vec<u64>,

    /// Fraction of each farm's eligible nodes to deploy on, in [0, 1]
    pub deployment_strategy: f64,

    /// Recovery policy for partially-failed batches
    pub failure_strategy: FailureStrategy,

    /// Maximum deployment attempts under the retry strategy
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Grid gateway connection settings
    pub grid: GridSettings,

    /// Account mnemonic used to authenticate against the gateway
    pub mnemonic: SecretString,

    /// Public SSH key injected into every VM
    pub ssh_key: SecretString,

    /// Telemetry sink settings injected into every VM
    pub influx: InfluxSettings,
}

/// Grid gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct GridSettings {
    /// Base URL of the grid gateway REST API
    pub gateway: String,
}

/// InfluxDB connection settings for the VMs' telemetry
#[derive(Debug, Deserialize)]
pub struct InfluxSettings {
    pub url: String,
    pub org: String,
    pub token: SecretString,
    pub bucket: String,
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SpawnerError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the loaded configuration
    pub fn validate(&self) -> Result<(), SpawnerError> {
        if self.farms.is_empty() {
            return Err(SpawnerError::ConfigError(
                "at least one farm must be configured".to_string(),
            ));
        }
        for &farm in &self.farms {
            if farm == 0 {
                return Err(SpawnerError::ConfigError(
                    "invalid farm ID: 0, must be a positive integer".to_string(),
                ));
            }
        }

        if !(0.0..=1.0).contains(&self.deployment_strategy) {
            return Err(SpawnerError::ConfigError(format!(
                "invalid deployment strategy: {}, must be between 0 and 1",
                self.deployment_strategy
            )));
        }

        if self.max_retries == 0 {
            return Err(SpawnerError::ConfigError(
                "max_retries must be at least 1".to_string(),
            ));
        }

        validate_http_url("grid gateway", &self.grid.gateway)?;
        validate_mnemonic(&self.mnemonic)?;

        if self.ssh_key.expose_secret().trim().is_empty() {
            return Err(SpawnerError::ConfigError(
                "SSH key cannot be empty".to_string(),
            ));
        }

        validate_http_url("influx", &self.influx.url)?;
        if self.influx.org.trim().is_empty() {
            return Err(SpawnerError::ConfigError(
                "influx organization cannot be empty".to_string(),
            ));
        }
        if self.influx.token.expose_secret().trim().is_empty() {
            return Err(SpawnerError::ConfigError(
                "influx token cannot be empty".to_string(),
            ));
        }
        if self.influx.bucket.trim().is_empty() {
            return Err(SpawnerError::ConfigError(
                "influx bucket cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_http_url(what: &str, value: &str) -> Result<(), SpawnerError> {
    let url = Url::parse(value)
        .map_err(|e| SpawnerError::ConfigError(format!("invalid {} URL '{}': {}", what, value, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(SpawnerError::ConfigError(format!(
            "invalid {} URL '{}': scheme must be http or https",
            what, value
        )));
    }
    Ok(())
}

fn validate_mnemonic(mnemonic: &SecretString) -> Result<(), SpawnerError> {
    let words = mnemonic.expose_secret().split_whitespace().count();
    if !matches!(words, 12 | 15 | 18 | 21 | 24) {
        return Err(SpawnerError::ConfigError(format!(
            "invalid mnemonic: expected 12, 15, 18, 21 or 24 words, got {}",
            words
        )));
    }
    Ok(())
}
