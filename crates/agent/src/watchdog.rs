//! Connection liveness watchdog.
//!
//! A single timer that must be kicked periodically by inbound traffic.
//! When it expires, the session is presumed stalled: the timer emits an
//! expiry event onto the session's queue and re-arms itself, so there is
//! always exactly one pending timer while the watchdog is armed.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Depth of the expiry event queue.
const EXPIRY_QUEUE_DEPTH: usize = 8;

/// Marker event emitted when the liveness deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogExpired;

/// Liveness watchdog for one transport session.
///
/// Invariant: at most one timer task is live at any time. [`start`]
/// cancels any prior timer before arming a new one, and an expiry re-arms
/// by looping inside the same task.
///
/// [`start`]: ConnectionWatchdog::start
pub struct ConnectionWatchdog {
    period: Duration,
    expiry_tx: mpsc::Sender<WatchdogExpired>,
    handle: Option<JoinHandle<()>>,
}

impl ConnectionWatchdog {
    /// Create an unarmed watchdog and the receiving end of its expiry
    /// events.
    pub fn new(period: Duration) -> (Self, mpsc::Receiver<WatchdogExpired>) {
        let (expiry_tx, expiry_rx) = mpsc::channel(EXPIRY_QUEUE_DEPTH);
        (
            Self {
                period,
                expiry_tx,
                handle: None,
            },
            expiry_rx,
        )
    }

    /// Arm the watchdog, replacing any timer already pending.
    pub fn start(&mut self) {
        self.cancel();

        let period = self.period;
        let expiry_tx = self.expiry_tx.clone();
        self.handle = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                if expiry_tx.send(WatchdogExpired).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Confirm liveness: restart the deadline from now.
    pub fn kick(&mut self) {
        self.start();
    }

    /// Stop the timer if one is pending. Calling this while unarmed is a
    /// no-op.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}
