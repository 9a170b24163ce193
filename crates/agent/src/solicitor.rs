//! Periodic job solicitation.
//!
//! Every solicitation interval the agent asks the coordination service for
//! its next pending job. The decision of whether a given tick solicits is
//! pure and lives here; the interval itself is driven by the session loop.

use aukes_core::{channels, jobs::JobRequest};

/// A solicitation to publish on the request-next channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Solicitation {
    pub channel: String,
    pub payload: serde_json::Value,
}

/// Builds the recurring "give me the next job" request for one device.
pub struct JobSolicitor {
    request: JobRequest,
    channel: String,
}

impl JobSolicitor {
    pub fn new(thing_name: &str) -> Self {
        Self {
            request: JobRequest {
                thing_name: thing_name.to_string(),
            },
            channel: channels::request_next(thing_name),
        }
    }

    /// Decide what this tick should do.
    ///
    /// Returns `None` while a job is in flight so that a slow handshake
    /// cannot pile up duplicate outstanding requests.
    pub fn on_tick(&self, job_in_flight: bool) -> Option<Solicitation> {
        if job_in_flight {
            tracing::debug!("Job in flight, skipping solicitation");
            return None;
        }

        Some(Solicitation {
            channel: self.channel.clone(),
            payload: serde_json::to_value(&self.request)
                .expect("JobRequest is always serialisable"),
        })
    }
}
