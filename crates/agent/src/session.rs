//! Agent session loop.
//!
//! Drives one transport session at a time: subscribe the job response
//! channels, arm the liveness watchdog, then interleave solicitation
//! ticks, watchdog expiries and inbound notifications on a single
//! `tokio::select!` loop until cancellation or transport loss. All
//! transport failures are logged and never stop the timers.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use aukes_core::channels;

use crate::config::AgentConfig;
use crate::handler::{self, HandlerOutcome};
use crate::solicitor::JobSolicitor;
use crate::transport::{self, Inbound, JobBus, Qos};
use crate::watchdog::ConnectionWatchdog;

/// Delay before redialing after a session ends.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Run the agent until cancelled.
///
/// Connects, drives one session to completion, then redials with a fixed
/// delay. Timers are created with each session and torn down with it.
pub async fn run(config: &AgentConfig, cancel: CancellationToken) {
    loop {
        tracing::info!(endpoint = %config.endpoint, "Dialing coordination service");

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Shutdown requested");
                return;
            }
            result = transport::connect(config) => match result {
                Ok((mut bus, mut inbound)) => {
                    run_session(&mut bus, &mut inbound, config, &cancel).await;
                    if cancel.is_cancelled() {
                        return;
                    }
                    tracing::warn!("Session ended, redialing");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Connection failed");
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
}

/// Drive a single session over an established transport.
pub async fn run_session<B: JobBus>(
    bus: &mut B,
    inbound: &mut mpsc::Receiver<Inbound>,
    config: &AgentConfig,
    cancel: &CancellationToken,
) {
    let thing_name = config.client_id.as_str();

    // Response subscriptions come up before the first solicitation so no
    // assignment can be missed.
    for channel in [
        channels::request_next_accepted(thing_name),
        channels::pending_accepted(thing_name),
    ] {
        if let Err(e) = bus.subscribe(&channel, Qos::AtMostOnce).await {
            tracing::error!(channel = %channel, error = %e, "Subscribe failed");
        }
    }

    let (mut watchdog, mut expiries) = ConnectionWatchdog::new(config.watchdog_period);
    watchdog.start();

    let solicitor = JobSolicitor::new(thing_name);
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + config.solicit_interval,
        config.solicit_interval,
    );

    let mut job_in_flight = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                watchdog.cancel();
                tracing::info!("Session cancelled, timers stopped");
                break;
            }
            _ = ticker.tick() => {
                if let Some(solicitation) = solicitor.on_tick(job_in_flight) {
                    tracing::info!(channel = %solicitation.channel, "Requesting next pending job");
                    if let Err(e) = bus
                        .publish(&solicitation.channel, solicitation.payload, Qos::AtMostOnce)
                        .await
                    {
                        tracing::error!(error = %e, "Solicitation publish failed");
                    }
                }
            }
            Some(_) = expiries.recv() => {
                // TODO: tear the session down here and let `run` redial,
                // instead of only re-arming.
                tracing::warn!(
                    period_secs = config.watchdog_period.as_secs(),
                    "Liveness deadline passed without traffic",
                );
            }
            msg = inbound.recv() => match msg {
                Some(event) => {
                    watchdog.kick();
                    handle_event(bus, &event, thing_name, &mut job_in_flight).await;
                }
                None => {
                    watchdog.cancel();
                    tracing::warn!("Inbound queue closed, session over");
                    break;
                }
            }
        }
    }
}

/// Dispatch one inbound notification and perform its outbound actions.
async fn handle_event<B: JobBus>(
    bus: &mut B,
    event: &Inbound,
    thing_name: &str,
    job_in_flight: &mut bool,
) {
    match handler::handle_inbound(event, thing_name) {
        HandlerOutcome::CompleteJob { update } => {
            *job_in_flight = true;
            tracing::info!(
                job_id = %update.job_id,
                status = ?update.status,
                "Job received, reporting completion",
            );

            let payload =
                serde_json::to_value(&update).expect("UpdateRequest is always serialisable");
            if let Err(e) = bus
                .publish(&channels::update(thing_name), payload, Qos::AtMostOnce)
                .await
            {
                tracing::error!(job_id = %update.job_id, error = %e, "Status update publish failed");
            }

            // Completion is immediate in this protocol; once the update is
            // out, the job is no longer in flight.
            *job_in_flight = false;
        }
        HandlerOutcome::PendingJobs { in_progress, queued } => {
            tracing::info!(in_progress, queued, "Pending job snapshot received");
        }
        HandlerOutcome::Ignored => {
            tracing::debug!(channel = %event.channel, "Ignoring notification on unhandled channel");
        }
    }
}
