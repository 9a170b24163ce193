//! `aukes-agent` -- job-polling device agent.
//!
//! Maintains a persistent pub/sub connection to a job-coordination
//! service, periodically solicits the next pending job, and reports each
//! accepted job's completion. A liveness watchdog runs alongside the
//! solicitation loop; SIGINT/SIGTERM stop all timers and exit cleanly.
//!
//! # Environment variables
//!
//! | Variable                     | Required | Default | Description                        |
//! |------------------------------|----------|---------|------------------------------------|
//! | `AUKES_SOLICIT_INTERVAL_SECS`| no       | `10`    | Seconds between job solicitations  |
//! | `AUKES_WATCHDOG_SECS`        | no       | `30`    | Liveness watchdog period           |
//! | `RUST_LOG`                   | no       | --      | Overrides the `--verbosity` filter |

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aukes_agent::cli::{Cli, Verbosity};
use aukes_agent::config::AgentConfig;
use aukes_agent::{session, shutdown};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbosity);

    let config = AgentConfig::from_cli(cli)?;

    tracing::info!(
        client_id = %config.client_id,
        endpoint = %config.endpoint,
        topic = %config.topic,
        solicit_interval_secs = config.solicit_interval.as_secs(),
        watchdog_secs = config.watchdog_period.as_secs(),
        "Starting aukes-agent",
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown::shutdown_signal().await;
        signal_cancel.cancel();
    });

    session::run(&config, cancel).await;

    tracing::info!("Agent stopped");
    Ok(())
}

/// Initialise tracing from the CLI verbosity; `RUST_LOG` takes precedence
/// when set.
fn init_tracing(verbosity: Verbosity) {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(verbosity.level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
