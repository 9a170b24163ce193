//! Inbound job notification handling.
//!
//! Each notification delivered on the inbound queue is mapped to a
//! [`HandlerOutcome`] by a pure function, so the handshake logic is
//! unit-testable without a live transport. Malformed payloads degrade to
//! defaults instead of faulting; the agent must keep processing subsequent
//! notifications no matter what arrives.

use aukes_core::channels;
use aukes_core::jobs::{JobStatus, NextJobAccepted, PendingJobsAccepted, UpdateRequest, JOB_ID_UNKNOWN};

use crate::transport::Inbound;

/// What the session loop should do with one inbound notification.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// A job offer arrived: publish exactly one status update for it.
    CompleteJob { update: UpdateRequest },
    /// Snapshot of jobs queued while the device was away. Observation
    /// only; a pass-through hook for handling missed jobs later.
    PendingJobs { in_progress: usize, queued: usize },
    /// Not a notification this agent acts on.
    Ignored,
}

/// Map one inbound notification to its outcome.
///
/// A notification on the request-next accepted channel always yields
/// exactly one [`HandlerOutcome::CompleteJob`], substituting
/// [`JOB_ID_UNKNOWN`] when the offer carries no job id. The job is
/// reported complete as soon as it is accepted; real work execution slots
/// in between those two steps.
pub fn handle_inbound(inbound: &Inbound, thing_name: &str) -> HandlerOutcome {
    if inbound.channel == channels::request_next_accepted(thing_name) {
        let job_id = match serde_json::from_value::<NextJobAccepted>(inbound.payload.clone()) {
            Ok(accepted) => accepted
                .execution
                .map(|execution| execution.job_id_or_unknown().to_string())
                .unwrap_or_else(|| JOB_ID_UNKNOWN.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed job offer, defaulting job id");
                JOB_ID_UNKNOWN.to_string()
            }
        };

        HandlerOutcome::CompleteJob {
            update: UpdateRequest {
                job_id,
                thing_name: thing_name.to_string(),
                status: JobStatus::Succeeded,
            },
        }
    } else if inbound.channel == channels::pending_accepted(thing_name) {
        match serde_json::from_value::<PendingJobsAccepted>(inbound.payload.clone()) {
            Ok(pending) => HandlerOutcome::PendingJobs {
                in_progress: pending.in_progress_jobs.len(),
                queued: pending.queued_jobs.len(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Malformed pending-jobs snapshot");
                HandlerOutcome::Ignored
            }
        }
    } else {
        HandlerOutcome::Ignored
    }
}
