//! `aukes-agent` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod cli;
pub mod config;
pub mod handler;
pub mod session;
pub mod shutdown;
pub mod solicitor;
pub mod transport;
pub mod watchdog;
