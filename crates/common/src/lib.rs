//! Error-context plumbing and small utilities shared across the picker crates.

pub mod error;
pub mod time;

pub use error::FromMessage;
