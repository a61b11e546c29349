//! Metrics for the picker coordinator.
//!
//! Thin layer over the `metrics` facade: metric names live in
//! [`definitions`], and [`init_metrics`] installs a Prometheus recorder when
//! the `prometheus` feature is enabled. Without a recorder every macro call
//! is a no-op.
//!
//! ```rust,ignore
//! use picker_metrics::{counter, requests};
//!
//! counter!(requests::ADMITTED_TOTAL, labels::KIND => "pick_image").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, gauge, histogram};
