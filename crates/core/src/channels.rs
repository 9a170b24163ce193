//! Well-known jobs channel names.
//!
//! Every channel is namespaced under the device identity (the "thing name")
//! so that one coordination service can address many devices. These builders
//! must match the channel layout the coordination service routes on; the
//! session loop and the handler dispatch both go through them.

/// Channel a device publishes on to request its next pending job.
pub fn request_next(thing_name: &str) -> String {
    format!("jobs/{thing_name}/request-next")
}

/// Response channel carrying a job assigned after a request-next solicitation.
pub fn request_next_accepted(thing_name: &str) -> String {
    format!("jobs/{thing_name}/request-next/accepted")
}

/// Channel a device publishes on to query jobs already queued for it.
pub fn pending(thing_name: &str) -> String {
    format!("jobs/{thing_name}/pending")
}

/// Response channel carrying the set of queued and in-progress jobs.
pub fn pending_accepted(thing_name: &str) -> String {
    format!("jobs/{thing_name}/pending/accepted")
}

/// Channel a device publishes job status updates on.
pub fn update(thing_name: &str) -> String {
    format!("jobs/{thing_name}/update")
}
