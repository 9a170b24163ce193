//! Integration tests for the session event loop.
//!
//! Drives [`aukes_agent::session::run_session`] against an in-memory bus
//! under a paused clock, covering solicitation periodicity, the
//! accept-then-complete handshake, defensive defaults, and shutdown
//! semantics.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use aukes_agent::config::AgentConfig;
use aukes_agent::session;
use aukes_agent::transport::{Inbound, JobBus, Qos, TransportError};
use aukes_core::channels;

const THING: &str = "device-1";

#[derive(Debug, Clone, PartialEq)]
enum BusCall {
    Subscribe {
        channel: String,
    },
    Publish {
        channel: String,
        payload: serde_json::Value,
    },
}

/// In-memory [`JobBus`] that records every outbound call.
#[derive(Clone, Default)]
struct RecordingBus {
    calls: Arc<Mutex<Vec<BusCall>>>,
}

impl RecordingBus {
    fn subscribed_channels(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                BusCall::Subscribe { channel } => Some(channel.clone()),
                _ => None,
            })
            .collect()
    }

    fn publishes_on(&self, channel: &str) -> Vec<serde_json::Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                BusCall::Publish { channel: c, payload } if c == channel => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    fn publish_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, BusCall::Publish { .. }))
            .count()
    }
}

#[async_trait]
impl JobBus for RecordingBus {
    async fn subscribe(&mut self, channel: &str, _qos: Qos) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(BusCall::Subscribe {
            channel: channel.to_string(),
        });
        Ok(())
    }

    async fn publish(
        &mut self,
        channel: &str,
        payload: serde_json::Value,
        _qos: Qos,
    ) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(BusCall::Publish {
            channel: channel.to_string(),
            payload,
        });
        Ok(())
    }
}

fn test_config() -> AgentConfig {
    AgentConfig {
        endpoint: "coord.test".to_string(),
        client_id: THING.to_string(),
        clean_session: false,
        client_cert: "client.pem".into(),
        client_key: "client.key".into(),
        ca_cert: "ca.pem".into(),
        topic: "test-topic".to_string(),
        solicit_interval: Duration::from_secs(10),
        watchdog_period: Duration::from_secs(30),
    }
}

struct Harness {
    bus: RecordingBus,
    inbound_tx: mpsc::Sender<Inbound>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

fn spawn_session() -> Harness {
    let bus = RecordingBus::default();
    let mut session_bus = bus.clone();
    let (inbound_tx, mut inbound_rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let session_cancel = cancel.clone();
    let config = test_config();

    let handle = tokio::spawn(async move {
        session::run_session(&mut session_bus, &mut inbound_rx, &config, &session_cancel).await;
    });

    Harness {
        bus,
        inbound_tx,
        cancel,
        handle,
    }
}

/// Let the session task run up to the current instant.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn deliver(harness: &Harness, channel: String, payload: serde_json::Value) {
    harness
        .inbound_tx
        .send(Inbound { channel, payload })
        .await
        .expect("session should still be consuming");
    settle().await;
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn session_subscribes_both_response_channels_at_startup() {
    let harness = spawn_session();
    settle().await;

    assert_eq!(
        harness.bus.subscribed_channels(),
        vec![
            channels::request_next_accepted(THING),
            channels::pending_accepted(THING),
        ],
    );

    harness.cancel.cancel();
    harness.handle.await.unwrap();
}

// ---------------------------------------------------------------------------
// Solicitation periodicity
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn solicitor_issues_one_request_per_interval() {
    let harness = spawn_session();

    // Three full intervals: ticks at 10s, 20s and 30s.
    tokio::time::sleep(Duration::from_secs(35)).await;

    let requests = harness.bus.publishes_on(&channels::request_next(THING));
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert_eq!(request["thingName"], THING);
    }

    harness.cancel.cancel();
    harness.handle.await.unwrap();
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn accepted_job_is_reported_succeeded_exactly_once() {
    let harness = spawn_session();

    tokio::time::sleep(Duration::from_secs(12)).await;
    deliver(
        &harness,
        channels::request_next_accepted(THING),
        json!({"execution": {"jobId": "job-42", "status": "QUEUED"}}),
    )
    .await;

    let updates = harness.bus.publishes_on(&channels::update(THING));
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["jobId"], "job-42");
    assert_eq!(updates[0]["thingName"], THING);
    assert_eq!(updates[0]["status"], "SUCCEEDED");

    // Further solicitations happen, but no further updates until the next
    // accepted notification.
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(harness.bus.publishes_on(&channels::update(THING)).len(), 1);

    deliver(
        &harness,
        channels::request_next_accepted(THING),
        json!({"execution": {"jobId": "job-43"}}),
    )
    .await;
    let updates = harness.bus.publishes_on(&channels::update(THING));
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1]["jobId"], "job-43");

    harness.cancel.cancel();
    harness.handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn offer_without_job_id_updates_the_unknown_sentinel() {
    let harness = spawn_session();
    settle().await;

    deliver(
        &harness,
        channels::request_next_accepted(THING),
        json!({"execution": {"status": "QUEUED"}}),
    )
    .await;

    let updates = harness.bus.publishes_on(&channels::update(THING));
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["jobId"], "unknown");

    harness.cancel.cancel();
    harness.handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn malformed_offer_does_not_stall_the_handler() {
    let harness = spawn_session();
    settle().await;

    deliver(
        &harness,
        channels::request_next_accepted(THING),
        json!("not an object"),
    )
    .await;
    deliver(
        &harness,
        channels::request_next_accepted(THING),
        json!({"execution": {"jobId": "job-44"}}),
    )
    .await;

    let updates = harness.bus.publishes_on(&channels::update(THING));
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0]["jobId"], "unknown");
    assert_eq!(updates[1]["jobId"], "job-44");

    harness.cancel.cancel();
    harness.handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn pending_jobs_snapshot_produces_no_update() {
    let harness = spawn_session();
    settle().await;

    deliver(
        &harness,
        channels::pending_accepted(THING),
        json!({"queuedJobs": [{"jobId": "queued-1"}], "inProgressJobs": []}),
    )
    .await;

    assert!(harness.bus.publishes_on(&channels::update(THING)).is_empty());

    harness.cancel.cancel();
    harness.handle.await.unwrap();
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancellation_stops_all_timers() {
    let harness = spawn_session();

    tokio::time::sleep(Duration::from_secs(15)).await;
    let published_before = harness.bus.publish_count();
    assert_eq!(published_before, 1);

    harness.cancel.cancel();
    harness.handle.await.unwrap();

    // Several solicitation intervals and watchdog periods later: nothing.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(harness.bus.publish_count(), published_before);
}

#[tokio::test(start_paused = true)]
async fn repeated_cancellation_is_harmless() {
    let harness = spawn_session();
    settle().await;

    harness.cancel.cancel();
    harness.cancel.cancel();
    harness.handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn closing_the_inbound_queue_ends_the_session() {
    let harness = spawn_session();
    settle().await;

    drop(harness.inbound_tx);
    harness.handle.await.unwrap();

    // The session's timers died with it.
    let published_before = harness.bus.publish_count();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.bus.publish_count(), published_before);
}
