//! Single-flight coordination of "acquire media" requests.
//!
//! A [`RequestCoordinator`] admits one request at a time, gates it on host
//! permissions, hands it to an external picker or camera, and delivers
//! exactly one [`Outcome`] back to the caller. State needed to finish the
//! request is written to a [`ResultCache`] before control leaves the
//! process, so a result that arrives after a restart can still be claimed
//! through [`RequestCoordinator::retrieve_lost_result`].

pub mod cache;
pub mod cache_file;
pub mod cache_memory;
pub mod coordinator;
pub mod correlation;
pub mod error;
pub mod launcher;
pub mod launcher_command;
pub mod permission;
pub mod resource;
pub mod sink;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use {
    cache::ResultCache,
    coordinator::RequestCoordinator,
    error::{Error, Result},
    launcher::{ExternalActionLauncher, LaunchRequest},
    permission::PermissionGate,
    resource::{CaptureTarget, ResourceResolver},
    sink::{ResponseReceiver, ResponseSink},
    types::*,
};
