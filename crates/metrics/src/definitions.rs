//! Metric name and label definitions.
//!
//! Every metric emitted by the picker crates is named here so the exported
//! set stays discoverable in one place.

/// Request admission and lifecycle.
pub mod requests {
    /// Requests admitted into the pending slot
    pub const ADMITTED_TOTAL: &str = "picker_requests_total";
    /// Requests rejected before admission (already active, invalid options)
    pub const REJECTED_TOTAL: &str = "picker_requests_rejected_total";
    /// Time from admission to terminal outcome, in seconds
    pub const DURATION_SECONDS: &str = "picker_request_duration_seconds";
    /// Requests currently occupying the pending slot (0 or 1)
    pub const IN_FLIGHT: &str = "picker_requests_in_flight";
}

/// Permission gate interactions.
pub mod permissions {
    /// Permission prompts issued to the host
    pub const PROMPTS_TOTAL: &str = "picker_permission_prompts_total";
    /// Prompts answered with a denial
    pub const DENIED_TOTAL: &str = "picker_permission_denied_total";
}

/// Terminal outcomes.
pub mod outcomes {
    /// Outcomes delivered, labelled by `outcome`
    pub const DELIVERED_TOTAL: &str = "picker_outcomes_total";
    /// Outcomes written to the result cache because the caller detached
    pub const PERSISTED_TOTAL: &str = "picker_outcomes_persisted_total";
    /// Outcomes claimed through the recovery entry point
    pub const RECOVERED_TOTAL: &str = "picker_recoveries_total";
}

/// Post-processing of selection records.
pub mod post_processing {
    /// Per-item failures (resize, cover extraction)
    pub const FAILURES_TOTAL: &str = "picker_post_processing_failures_total";
    /// Records dropped by the video duration filter
    pub const FILTERED_TOTAL: &str = "picker_post_processing_filtered_total";
}

/// Common label keys.
pub mod labels {
    pub const KIND: &str = "kind";
    pub const OUTCOME: &str = "outcome";
    pub const CAPABILITY: &str = "capability";
    pub const STAGE: &str = "stage";
}

/// Histogram bucket boundaries.
pub mod buckets {
    use once_cell::sync::Lazy;

    /// Request duration buckets in seconds. Users can sit in a picker for
    /// minutes, so the tail is long.
    pub static REQUEST_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.05, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0,
        ]
    });
}
