//! Action simulator client and local simulator host.
//!
//! The console never executes real actions. It dispatches each approved
//! action string to a simulator reachable over HTTP, which always
//! succeeds and returns a canned receipt. `host` provides an in-process
//! implementation of that simulator for local/standalone deployments;
//! `client` talks to whichever one is configured, local or otherwise.

pub mod client;
pub mod host;

pub use client::{SimulatedOutcome, SimulatorClient};
pub use host::ensure_started;
