//! The request coordinator: one pending slot, permission gating, hand-off
//! to the external subsystem, and exactly-once delivery.
//!
//! Lifecycle of the slot:
//!
//! ```text
//! Idle → Admitted → AwaitingPermission → Launching → AwaitingExternalResult → Resolved → Idle
//! ```
//!
//! The [`PersistedState`] record is written before anything is handed to
//! the launcher. A result that can no longer reach its caller, because the
//! receiver was dropped or the process restarted, is written there too and
//! claimed later through [`RequestCoordinator::retrieve_lost_result`].

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};

use {
    picker_media::ResultPostProcessor,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use picker_metrics::{
    counter, gauge, histogram, labels, outcomes as outcome_metrics,
    permissions as permission_metrics, requests as request_metrics,
};

use crate::{
    Result,
    cache::ResultCache,
    correlation::{self, Correlation},
    error::Error,
    launcher::{ExternalActionLauncher, LaunchRequest},
    permission::PermissionGate,
    resource::{CaptureTarget, ResourceResolver},
    sink::ResponseSink,
    types::*,
};

/// The single admitted, not yet resolved request.
struct PendingRequest {
    kind: RequestKind,
    options: RequestOptions,
    phase: RequestState,
    sink: Option<ResponseSink>,
    target: Option<CaptureTarget>,
    admitted_at: Instant,
}

impl PendingRequest {
    fn locator(&self) -> Option<String> {
        self.target.as_ref().map(|t| t.locator.clone())
    }
}

/// How an external result relates to the slot.
enum Claim {
    /// The pending request was waiting for it.
    Pending {
        options: PersistedOptions,
        locator: Option<String>,
        attached: bool,
    },
    /// Nothing is pending; the request belonged to an earlier process and
    /// is completed only if its launch snapshot is still in the cache.
    Detached,
    /// Something else is pending.
    Stale {
        pending: RequestKind,
        phase: RequestState,
    },
}

pub struct RequestCoordinator {
    cache: Arc<dyn ResultCache>,
    permissions: Arc<dyn PermissionGate>,
    launcher: Arc<dyn ExternalActionLauncher>,
    resources: Arc<dyn ResourceResolver>,
    post: ResultPostProcessor,
    default_quality: u8,
    slot: Mutex<Option<PendingRequest>>,
}

impl RequestCoordinator {
    pub fn new(
        cache: Arc<dyn ResultCache>,
        permissions: Arc<dyn PermissionGate>,
        launcher: Arc<dyn ExternalActionLauncher>,
        resources: Arc<dyn ResourceResolver>,
        post: ResultPostProcessor,
    ) -> Self {
        Self {
            cache,
            permissions,
            launcher,
            resources,
            post,
            default_quality: 100,
            slot: Mutex::new(None),
        }
    }

    /// JPEG quality used when a request does not set one.
    #[must_use]
    pub fn with_default_quality(mut self, quality: u8) -> Self {
        self.default_quality = quality;
        self
    }

    fn slot(&self) -> MutexGuard<'_, Option<PendingRequest>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> RequestState {
        self.slot()
            .as_ref()
            .map_or(RequestState::Idle, |p| p.phase)
    }

    pub fn pending_kind(&self) -> Option<RequestKind> {
        self.slot().as_ref().map(|p| p.kind)
    }

    // ── Admission ───────────────────────────────────────────────────────────

    /// Admit a request. The outcome, whatever it is, arrives on `sink`.
    ///
    /// A rejected request gets its error on `sink` as well as the returned
    /// `Err`; the request already in flight is not touched. Infrastructure
    /// failures after admission release the slot and drop `sink`.
    pub async fn begin(
        &self,
        kind: RequestKind,
        options: RequestOptions,
        sink: ResponseSink,
    ) -> Result<()> {
        if let Err(message) = options.validate() {
            warn!(kind = %kind, reason = %message, "rejected request with invalid options");
            #[cfg(feature = "metrics")]
            counter!(request_metrics::REJECTED_TOTAL, labels::KIND => kind.as_str(), labels::OUTCOME => "invalid_options").increment(1);
            let _ = sink.deliver(Outcome::error(ErrorCode::InvalidOptions, message.clone()));
            return Err(Error::invalid_options(message));
        }

        {
            let mut slot = self.slot();
            if let Some(active) = slot.as_ref() {
                warn!(
                    kind = %kind,
                    active = %active.kind,
                    phase = ?active.phase,
                    "rejected request, another is in flight"
                );
                #[cfg(feature = "metrics")]
                counter!(request_metrics::REJECTED_TOTAL, labels::KIND => kind.as_str(), labels::OUTCOME => "already_active").increment(1);
                drop(slot);
                let _ = sink.deliver(Outcome::already_active());
                return Err(Error::AlreadyActive);
            }
            *slot = Some(PendingRequest {
                kind,
                options: options.clone(),
                phase: RequestState::Admitted,
                sink: Some(sink),
                target: None,
                admitted_at: Instant::now(),
            });
        }
        info!(
            kind = %kind,
            max_count = options.max_selection_count,
            max_duration_secs = options.max_video_duration_secs,
            "admitted request"
        );
        #[cfg(feature = "metrics")]
        {
            counter!(request_metrics::ADMITTED_TOTAL, labels::KIND => kind.as_str()).increment(1);
            gauge!(request_metrics::IN_FLIGHT).set(1.0);
        }

        // A new request supersedes whatever an earlier one left behind.
        if let Err(e) = self.cache.clear().await {
            self.abandon(&e);
            return Err(e);
        }

        let capability = kind.capability();
        if self.permissions.needs_explicit_grant(capability)
            && !self.permissions.is_granted(capability)
        {
            self.with_pending(|p| p.phase = RequestState::AwaitingPermission);
            info!(kind = %kind, capability = %capability, "awaiting permission");
            #[cfg(feature = "metrics")]
            counter!(permission_metrics::PROMPTS_TOTAL, labels::CAPABILITY => capability.as_str()).increment(1);
            if let Err(e) = self
                .permissions
                .request(capability, correlation::permission_code(kind))
                .await
            {
                self.abandon(&e);
                return Err(e);
            }
            return Ok(());
        }

        self.with_pending(|p| p.phase = RequestState::Launching);
        self.launch().await
    }

    fn with_pending<R>(&self, f: impl FnOnce(&mut PendingRequest) -> R) -> Option<R> {
        self.slot().as_mut().map(f)
    }

    /// Empty the slot and hand back what was in it.
    fn release(&self) -> Option<PendingRequest> {
        let pending = self.slot().take();
        #[cfg(feature = "metrics")]
        if let Some(p) = &pending {
            gauge!(request_metrics::IN_FLIGHT).set(0.0);
            histogram!(request_metrics::DURATION_SECONDS, labels::KIND => p.kind.as_str())
                .record(p.admitted_at.elapsed().as_secs_f64());
        }
        pending
    }

    /// Drop the pending request after an infrastructure failure.
    fn abandon(&self, err: &Error) {
        if let Some(pending) = self.release() {
            error!(kind = %pending.kind, error = %err, "abandoning request");
        }
    }

    // ── Launch ──────────────────────────────────────────────────────────────

    async fn launch(&self) -> Result<()> {
        let result = self.try_launch().await;
        if let Err(e) = &result {
            self.abandon(e);
        }
        result
    }

    async fn try_launch(&self) -> Result<()> {
        let Some((kind, options)) = self.with_pending(|p| (p.kind, p.options.clone())) else {
            return Ok(());
        };

        if !self.launcher.resolve_handler(kind) {
            warn!(kind = %kind, "no handler available");
            return self.finish(Outcome::no_handler(kind)).await;
        }

        let target = if kind.capture_suffix().is_some() {
            let target = self.resources.allocate(kind).await?;
            self.resources.grant_access(&target).await?;
            Some(target)
        } else {
            None
        };

        let state = PersistedState::new(kind, PersistedOptions::from(&options))
            .with_locator(target.as_ref().map(|t| t.locator.clone()));
        self.cache.put(&state).await?;
        debug!(kind = %kind, locator = ?state.resource_locator, "saved state before hand-off");
        self.with_pending(|p| p.target = target.clone());

        let code = correlation::launch_code(kind);
        let handled = self
            .launcher
            .launch(LaunchRequest {
                kind,
                code,
                options: &options,
                target: target.as_ref(),
            })
            .await?;
        if !handled {
            warn!(kind = %kind, "launcher could not start the external flow");
            return self.finish(Outcome::no_handler(kind)).await;
        }

        self.with_pending(|p| {
            if p.phase == RequestState::Launching {
                p.phase = RequestState::AwaitingExternalResult;
            }
        });
        info!(kind = %kind, code, "launched, awaiting external result");
        Ok(())
    }

    // ── Host events ─────────────────────────────────────────────────────────

    /// Route a host event. Returns `false` for codes this coordinator does
    /// not own, and for results that match nothing it is waiting on.
    pub async fn dispatch(&self, event: HostEvent) -> Result<bool> {
        match event {
            HostEvent::PermissionResult { code, granted } => {
                self.on_permission_result(code, granted).await
            },
            HostEvent::ExternalResult { code, result } => {
                self.on_external_result(code, result).await
            },
        }
    }

    /// Drain `events` until every sender is gone.
    pub async fn run(self: Arc<Self>, mut events: HostEventReceiver) {
        while let Some(event) = events.recv().await {
            let code = event.code();
            match self.dispatch(event).await {
                Ok(true) => {},
                Ok(false) => debug!(code, "host event not handled"),
                Err(e) => error!(code, error = %e, "failed to handle host event"),
            }
        }
        debug!("host event channel closed");
    }

    pub async fn on_permission_result(&self, code: u32, granted: bool) -> Result<bool> {
        let Some(Correlation::Permission(kind)) = correlation::classify(code) else {
            return Ok(false);
        };

        let claimed = self
            .with_pending(|p| {
                if p.kind != kind || p.phase != RequestState::AwaitingPermission {
                    return false;
                }
                p.phase = if granted {
                    RequestState::Launching
                } else {
                    RequestState::Resolved
                };
                true
            })
            .unwrap_or(false);
        if !claimed {
            warn!(code, kind = %kind, "ignoring permission result nothing is waiting for");
            return Ok(true);
        }

        let capability = kind.capability();
        if granted {
            info!(kind = %kind, capability = %capability, "permission granted");
            self.launch().await?;
        } else {
            info!(kind = %kind, capability = %capability, "permission denied");
            #[cfg(feature = "metrics")]
            counter!(permission_metrics::DENIED_TOTAL, labels::CAPABILITY => capability.as_str()).increment(1);
            self.finish(Outcome::permission_denied(capability)).await?;
        }
        Ok(true)
    }

    pub async fn on_external_result(&self, code: u32, result: ExternalResult) -> Result<bool> {
        let Some(Correlation::Launch(kind)) = correlation::classify(code) else {
            return Ok(false);
        };

        let claim = {
            let mut slot = self.slot();
            match slot.as_mut() {
                Some(p)
                    if p.kind == kind
                        && matches!(
                            p.phase,
                            RequestState::Launching | RequestState::AwaitingExternalResult
                        ) =>
                {
                    p.phase = RequestState::Resolved;
                    Claim::Pending {
                        options: PersistedOptions::from(&p.options),
                        locator: p.locator(),
                        attached: p.sink.as_ref().is_some_and(ResponseSink::is_attached),
                    }
                },
                Some(p) => Claim::Stale {
                    pending: p.kind,
                    phase: p.phase,
                },
                None => Claim::Detached,
            }
        };

        match claim {
            Claim::Stale { pending, phase } => {
                warn!(
                    code,
                    kind = %kind,
                    pending = %pending,
                    phase = ?phase,
                    "ignoring external result that matches no waiting request"
                );
                Ok(false)
            },
            Claim::Pending {
                options,
                locator,
                attached,
            } => {
                info!(kind = %kind, attached, "external result received");
                let outcome = match self.collect(kind, &options, locator.as_deref(), result).await {
                    Collected::Done(outcome) => outcome,
                    Collected::Records(records) if attached => {
                        self.post_process(kind, &options, records, None).await
                    },
                    // Nobody is listening; keep the raw paths so the caller
                    // that recovers them decides the resize parameters.
                    Collected::Records(records) => {
                        let outcome = self.raw_outcome(kind, &options, &records);
                        self.finish_processed(outcome, false).await?;
                        return Ok(true);
                    },
                };
                self.finish(outcome).await?;
                Ok(true)
            },
            Claim::Detached => {
                // Only a launch snapshot of the same kind that is still
                // waiting for its outcome may be completed.
                let state = match self.cache.get().await {
                    Ok(Some(state)) if state.kind == kind && state.outcome.is_none() => state,
                    Ok(Some(state)) => {
                        warn!(
                            kind = %kind,
                            persisted = %state.kind,
                            has_outcome = state.outcome.is_some(),
                            "ignoring external result that matches no persisted request"
                        );
                        return Ok(false);
                    },
                    Ok(None) => {
                        warn!(kind = %kind, "ignoring external result with nothing persisted");
                        return Ok(false);
                    },
                    Err(e) => {
                        warn!(error = %e, "cannot read persisted state");
                        return Ok(false);
                    },
                };
                let (options, locator) = (state.options, state.resource_locator);
                info!(kind = %kind, "external result arrived with no pending request");
                let outcome = match self.collect(kind, &options, locator.as_deref(), result).await {
                    Collected::Done(outcome) => outcome,
                    Collected::Records(records) => self.raw_outcome(kind, &options, &records),
                };
                self.persist_outcome(kind, options, locator, outcome, false)
                    .await?;
                Ok(true)
            },
        }
    }

    // ── Results ─────────────────────────────────────────────────────────────

    /// Turn what the subsystem returned into records, or a final outcome
    /// when there is nothing to process.
    async fn collect(
        &self,
        kind: RequestKind,
        options: &PersistedOptions,
        locator: Option<&str>,
        result: ExternalResult,
    ) -> Collected {
        let mut records = match result {
            ExternalResult::Cancelled => {
                info!(kind = %kind, "external flow cancelled");
                return Collected::Done(Outcome::cancelled());
            },
            ExternalResult::Selected(records) => records,
            ExternalResult::WroteTarget => match self.read_target(locator).await {
                Some(path) => vec![SelectionRecord::from_path(path)],
                None => {
                    info!(kind = %kind, "capture target left empty, treating as cancelled");
                    return Collected::Done(Outcome::cancelled());
                },
            },
        };
        if records.is_empty() {
            return Collected::Done(Outcome::cancelled());
        }
        let max = options.max_selection_count.max(1) as usize;
        if records.len() > max {
            warn!(kind = %kind, got = records.len(), max, "dropping records over the selection limit");
            records.truncate(max);
        }
        Collected::Records(records)
    }

    async fn read_target(&self, locator: Option<&str>) -> Option<PathBuf> {
        let locator = locator?;
        match self.resources.resolve(locator).await {
            Ok(path) => path,
            Err(e) => {
                warn!(locator, error = %e, "cannot resolve capture target");
                None
            },
        }
    }

    /// Resize images, or extract covers and filter videos.
    async fn post_process(
        &self,
        kind: RequestKind,
        options: &PersistedOptions,
        records: Vec<SelectionRecord>,
        resize: Option<ResizeParams>,
    ) -> Outcome {
        let params = resize.unwrap_or_else(|| options.resize_params(self.default_quality));
        if kind.is_video() {
            let assets = self
                .post
                .process_videos(&records, params, options.max_video_duration_secs)
                .await;
            return Outcome::videos(assets);
        }
        match self.post.process_images(&records, params).await {
            Ok(paths) => Outcome::images(paths),
            Err(e) => {
                warn!(kind = %kind, error = %e, "post-processing failed");
                Outcome::error(ErrorCode::PostProcessingFailed, e.to_string())
            },
        }
    }

    /// Precedence-resolved paths with nothing derived from them yet.
    fn raw_outcome(
        &self,
        kind: RequestKind,
        options: &PersistedOptions,
        records: &[SelectionRecord],
    ) -> Outcome {
        if !kind.is_video() {
            return Outcome::images(
                records
                    .iter()
                    .map(|r| r.resolved_path().to_path_buf())
                    .collect(),
            );
        }
        Outcome::videos(
            records
                .iter()
                .filter(|r| !r.exceeds_duration(options.max_video_duration_secs))
                .map(|r| VideoAsset {
                    video_path: r.resolved_path().to_path_buf(),
                    cover_path: None,
                })
                .collect(),
        )
    }

    // ── Delivery ────────────────────────────────────────────────────────────

    /// Deliver a terminal outcome for the pending request.
    async fn finish(&self, outcome: Outcome) -> Result<()> {
        self.finish_processed(outcome, true).await
    }

    async fn finish_processed(&self, outcome: Outcome, processed: bool) -> Result<()> {
        let Some(mut pending) = self.release() else {
            return Ok(());
        };
        let kind = pending.kind;
        let elapsed_ms = pending.admitted_at.elapsed().as_millis();
        let options = PersistedOptions::from(&pending.options);
        let locator = pending.locator();

        let undelivered = match pending.sink.take() {
            Some(sink) => sink.deliver(outcome).err(),
            None => Some(outcome),
        };
        match undelivered {
            None => {
                info!(kind = %kind, elapsed_ms, "delivered outcome");
                #[cfg(feature = "metrics")]
                counter!(outcome_metrics::DELIVERED_TOTAL, labels::KIND => kind.as_str()).increment(1);
                // Nothing left to recover once the caller has it.
                self.cache.clear().await
            },
            Some(outcome) => {
                info!(kind = %kind, elapsed_ms, "caller detached before resolution");
                self.persist_outcome(kind, options, locator, outcome, processed)
                    .await
            },
        }
    }

    async fn persist_outcome(
        &self,
        kind: RequestKind,
        options: PersistedOptions,
        locator: Option<String>,
        outcome: Outcome,
        processed: bool,
    ) -> Result<()> {
        let label = outcome.label();
        let mut state = PersistedState::new(kind, options).with_locator(locator);
        state.outcome = Some(outcome);
        state.processed = processed || !state.outcome.as_ref().is_some_and(Outcome::is_success);
        self.cache.put(&state).await?;
        info!(kind = %kind, outcome = label, processed = state.processed, "persisted outcome for recovery");
        #[cfg(feature = "metrics")]
        counter!(outcome_metrics::PERSISTED_TOTAL, labels::KIND => kind.as_str(), labels::OUTCOME => label).increment(1);
        Ok(())
    }

    // ── Recovery ────────────────────────────────────────────────────────────

    /// Claim the most recent unclaimed outcome, if any.
    ///
    /// Unprocessed outcomes are post-processed now, with `resize` when given
    /// and the persisted parameters otherwise. The persisted record is
    /// cleared afterwards, so a second call returns `None`. The exception is
    /// the hand-off snapshot of a request still pending in this process,
    /// which is not lost and is left in place.
    pub async fn retrieve_lost_result(
        &self,
        resize: Option<ResizeParams>,
    ) -> Result<Option<Outcome>> {
        let state = match self.cache.get().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "discarding unreadable persisted state");
                None
            },
        };

        if let Some(state) = &state
            && state.outcome.is_none()
            && self.pending_kind() == Some(state.kind)
        {
            debug!(kind = %state.kind, "persisted state belongs to the request in flight");
            return Ok(None);
        }

        let recovered = match state {
            Some(state) => self.recover(state, resize).await,
            None => None,
        };
        self.cache.clear().await?;

        match &recovered {
            Some(outcome) => {
                info!(outcome = outcome.label(), "recovered lost result");
                #[cfg(feature = "metrics")]
                counter!(outcome_metrics::RECOVERED_TOTAL, labels::OUTCOME => outcome.label()).increment(1);
            },
            None => debug!("no lost result to recover"),
        }
        Ok(recovered)
    }

    async fn recover(&self, state: PersistedState, resize: Option<ResizeParams>) -> Option<Outcome> {
        let PersistedState {
            kind,
            options,
            resource_locator,
            outcome,
            processed,
            ..
        } = state;

        let records: Vec<SelectionRecord> = match outcome {
            Some(outcome) if processed => return Some(outcome),
            Some(Outcome::Success {
                payload: Payload::Images(paths),
            }) => paths.into_iter().map(SelectionRecord::from_path).collect(),
            Some(Outcome::Success {
                payload: Payload::Videos(assets),
            }) => assets
                .into_iter()
                .map(|a| SelectionRecord::from_path(a.video_path))
                .collect(),
            Some(outcome) => return Some(outcome),
            None => {
                let path = self.read_target(resource_locator.as_deref()).await?;
                info!(kind = %kind, path = %path.display(), "capture target was written after restart");
                vec![SelectionRecord::from_path(path)]
            },
        };
        if records.is_empty() {
            return Some(Outcome::cancelled());
        }
        Some(self.post_process(kind, &options, records, resize).await)
    }
}

enum Collected {
    Done(Outcome),
    Records(Vec<SelectionRecord>),
}
