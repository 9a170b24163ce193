//! Agent configuration.
//!
//! All CLI and environment input is folded into one immutable
//! [`AgentConfig`] validated exactly once at startup; the rest of the agent
//! never touches `std::env` or argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;

use crate::cli::Cli;

/// Default seconds between job solicitations.
const DEFAULT_SOLICIT_INTERVAL_SECS: u64 = 10;

/// Default seconds before the liveness watchdog expires.
const DEFAULT_WATCHDOG_SECS: u64 = 30;

/// Env var overriding the solicitation interval (seconds).
const ENV_SOLICIT_INTERVAL: &str = "AUKES_SOLICIT_INTERVAL_SECS";

/// Env var overriding the watchdog period (seconds).
const ENV_WATCHDOG: &str = "AUKES_WATCHDOG_SECS";

/// Immutable agent configuration, validated once at startup.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Coordination service endpoint, host[:port].
    pub endpoint: String,
    /// Client identity; also the "thing name" in jobs channel names.
    pub client_id: String,
    /// Always `false`: queued messages must persist across reconnects
    /// for this client identity.
    pub clean_session: bool,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
    pub ca_cert: PathBuf,
    /// Free-form pub/sub topic from the CLI; not used by the jobs
    /// handshake.
    pub topic: String,
    pub solicit_interval: Duration,
    pub watchdog_period: Duration,
}

/// Errors surfaced by startup validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("an --endpoint is required to connect")]
    MissingEndpoint,

    #[error("certificate file not found: {0}")]
    CertNotFound(PathBuf),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnvOverride { var: &'static str, value: String },
}

impl AgentConfig {
    /// Validate CLI arguments (plus interval env overrides) into a config.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let endpoint = cli.endpoint.ok_or(ConfigError::MissingEndpoint)?;

        for path in [&cli.client_cert, &cli.client_key, &cli.ca_cert] {
            if !path.is_file() {
                return Err(ConfigError::CertNotFound(path.clone()));
            }
        }

        Ok(Self {
            endpoint,
            client_id: resolve_client_id(cli.client_id),
            clean_session: false,
            client_cert: cli.client_cert,
            client_key: cli.client_key,
            ca_cert: cli.ca_cert,
            topic: cli.topic,
            solicit_interval: Duration::from_secs(interval_secs(
                ENV_SOLICIT_INTERVAL,
                DEFAULT_SOLICIT_INTERVAL_SECS,
            )?),
            watchdog_period: Duration::from_secs(interval_secs(
                ENV_WATCHDOG,
                DEFAULT_WATCHDOG_SECS,
            )?),
        })
    }
}

/// An empty client id falls back to a randomized `test-<n>` identity so
/// that two misconfigured devices do not collide on the broker.
fn resolve_client_id(client_id: String) -> String {
    if client_id.is_empty() {
        let n: u32 = rand::rng().random_range(0..100_000_000);
        format!("test-{n}")
    } else {
        client_id
    }
}

/// Read a seconds value from the environment, falling back to `default`.
fn interval_secs(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidEnvOverride { var, value }),
        Err(_) => Ok(default),
    }
}
