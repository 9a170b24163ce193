//! Command-line interface for the device agent.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

/// Aukes device agent -- polls a job-coordination service for work over a
/// persistent pub/sub connection.
#[derive(Debug, Parser)]
#[command(name = "aukes-agent", version, about)]
pub struct Cli {
    /// Coordination service endpoint, host[:port] without a scheme.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Path to the client certificate (PEM).
    #[arg(long)]
    pub client_cert: PathBuf,

    /// Path to the client certificate key (PEM).
    #[arg(long)]
    pub client_key: PathBuf,

    /// Path to the CA certificate (PEM).
    #[arg(long)]
    pub ca_cert: PathBuf,

    /// Log verbosity.
    #[arg(long, short = 'v', value_enum, default_value_t = Verbosity::Info)]
    pub verbosity: Verbosity,

    /// Topic to publish and subscribe to. Carried in the configuration;
    /// the jobs handshake itself uses the well-known jobs channels.
    #[arg(long, default_value = "test-topic")]
    pub topic: String,

    /// Client identity presented to the coordination service. An empty
    /// value selects a randomized fallback id.
    #[arg(long, default_value = "aukes-device")]
    pub client_id: String,
}

/// Log verbosity levels accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum Verbosity {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    None,
}

impl Verbosity {
    /// Map onto a `tracing` level filter. There is no fatal level in
    /// `tracing`, so `fatal` clamps to `error`; `none` disables output.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Fatal | Verbosity::Error => LevelFilter::ERROR,
            Verbosity::Warn => LevelFilter::WARN,
            Verbosity::Info => LevelFilter::INFO,
            Verbosity::Debug => LevelFilter::DEBUG,
            Verbosity::Trace => LevelFilter::TRACE,
            Verbosity::None => LevelFilter::OFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn defaults_match_the_documented_surface() {
        let cli = parse(&[
            "aukes-agent",
            "--client-cert",
            "client.pem",
            "--client-key",
            "client.key",
            "--ca-cert",
            "ca.pem",
        ]);

        assert_eq!(cli.endpoint, None);
        assert_eq!(cli.verbosity, Verbosity::Info);
        assert_eq!(cli.topic, "test-topic");
        assert_eq!(cli.client_id, "aukes-device");
    }

    #[test]
    fn cert_flags_are_required() {
        let result = Cli::try_parse_from(["aukes-agent", "--endpoint", "coord.example.com"]);
        assert!(result.is_err());
    }

    #[test]
    fn verbosity_maps_to_level_filters() {
        assert_eq!(Verbosity::Fatal.level_filter(), LevelFilter::ERROR);
        assert_eq!(Verbosity::Trace.level_filter(), LevelFilter::TRACE);
        assert_eq!(Verbosity::None.level_filter(), LevelFilter::OFF);
    }
}
