//! Jobs-protocol message types.
//!
//! Wire format is camelCase JSON (`jobId`, `thingName`) with
//! SCREAMING_SNAKE_CASE status values. Inbound payloads are parsed
//! defensively: every field of a [`JobExecution`] is optional and a missing
//! job id is substituted with [`JOB_ID_UNKNOWN`] rather than treated as an
//! error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel job id used when an inbound job offer carries no id.
pub const JOB_ID_UNKNOWN: &str = "unknown";

/// Lifecycle status of a job execution, as tracked by the coordination
/// service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    InProgress,
    Succeeded,
    Failed,
    TimedOut,
    Rejected,
    Canceled,
}

impl JobStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded
                | JobStatus::Failed
                | JobStatus::TimedOut
                | JobStatus::Rejected
                | JobStatus::Canceled
        )
    }
}

/// Identifies the requesting device. Built once from configuration and
/// reused for every solicitation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub thing_name: String,
}

/// A job offered to the device by the coordination service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobExecution {
    pub job_id: Option<String>,
    pub status: Option<JobStatus>,
    /// Opaque work description; interpretation is up to the executor.
    pub job_document: Option<serde_json::Value>,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub version_number: Option<i64>,
}

impl JobExecution {
    /// The job id, or [`JOB_ID_UNKNOWN`] when the offer omitted it.
    pub fn job_id_or_unknown(&self) -> &str {
        self.job_id.as_deref().unwrap_or(JOB_ID_UNKNOWN)
    }
}

/// Payload of the `request-next/accepted` response channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NextJobAccepted {
    pub execution: Option<JobExecution>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Abbreviated job record as listed in a pending-jobs response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSummary {
    pub job_id: Option<String>,
    pub queued_at: Option<DateTime<Utc>>,
    pub version_number: Option<i64>,
}

/// Payload of the `pending/accepted` response channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PendingJobsAccepted {
    pub in_progress_jobs: Vec<JobSummary>,
    pub queued_jobs: Vec<JobSummary>,
}

/// Outbound status report for a single job execution.
///
/// Only ever constructed after a corresponding [`JobExecution`] has been
/// observed; the agent never speculates about job state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub job_id: String,
    pub thing_name: String,
    pub status: JobStatus,
}
