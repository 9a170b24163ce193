//! `aukes-core` -- shared jobs-protocol model.
//!
//! This crate holds the channel naming scheme and the message types spoken
//! between a device agent and the job-coordination service. It lives in its
//! own crate (zero internal deps) so it can be used by the agent binary and
//! any future CLI tooling.

pub mod channels;
pub mod jobs;
