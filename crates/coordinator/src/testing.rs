//! In-memory doubles for the coordinator's host capabilities.
//!
//! None of them post host events; tests drive the coordinator by calling
//! [`RequestCoordinator::dispatch`](crate::RequestCoordinator::dispatch)
//! themselves.

use std::{
    collections::HashSet,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::{
    Result,
    cache::ResultCache,
    error::Error,
    launcher::{ExternalActionLauncher, LaunchRequest},
    permission::PermissionGate,
    resource::{CaptureTarget, ResourceResolver},
    types::{Capability, PersistedState, RequestKind, RequestOptions},
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ── Permissions ─────────────────────────────────────────────────────────────

/// Fixed grant table. Every capability needs an explicit grant unless
/// marked otherwise.
#[derive(Default)]
pub struct StaticPermissionGate {
    granted: Mutex<HashSet<Capability>>,
    implicit: HashSet<Capability>,
    requests: Mutex<Vec<(Capability, u32)>>,
}

impl StaticPermissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn granted(self, capability: Capability) -> Self {
        lock(&self.granted).insert(capability);
        self
    }

    #[must_use]
    pub fn implicit(mut self, capability: Capability) -> Self {
        self.implicit.insert(capability);
        self
    }

    pub fn requests(&self) -> Vec<(Capability, u32)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl PermissionGate for StaticPermissionGate {
    fn is_granted(&self, capability: Capability) -> bool {
        lock(&self.granted).contains(&capability)
    }

    fn needs_explicit_grant(&self, capability: Capability) -> bool {
        !self.implicit.contains(&capability)
    }

    async fn request(&self, capability: Capability, code: u32) -> Result<()> {
        lock(&self.requests).push((capability, code));
        Ok(())
    }
}

// ── Launcher ────────────────────────────────────────────────────────────────

/// One recorded call to [`ExternalActionLauncher::launch`].
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub kind: RequestKind,
    pub code: u32,
    pub options: RequestOptions,
    pub target: Option<CaptureTarget>,
    /// Cache contents at the moment of the call, when a probe is attached.
    pub cache_snapshot: Option<PersistedState>,
}

#[derive(Default)]
pub struct ScriptedLauncher {
    unavailable: HashSet<RequestKind>,
    refuse: bool,
    fail: bool,
    probe: Option<Arc<dyn ResultCache>>,
    launches: Mutex<Vec<LaunchRecord>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// `resolve_handler` reports no handler for `kind`.
    #[must_use]
    pub fn without_handler(mut self, kind: RequestKind) -> Self {
        self.unavailable.insert(kind);
        self
    }

    /// `launch` returns `Ok(false)`.
    #[must_use]
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// `launch` returns an error.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    #[must_use]
    pub fn with_cache_probe(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.probe = Some(cache);
        self
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        lock(&self.launches).clone()
    }
}

#[async_trait]
impl ExternalActionLauncher for ScriptedLauncher {
    fn resolve_handler(&self, kind: RequestKind) -> bool {
        !self.unavailable.contains(&kind)
    }

    async fn launch(&self, request: LaunchRequest<'_>) -> Result<bool> {
        let cache_snapshot = match &self.probe {
            Some(cache) => cache.get().await?,
            None => None,
        };
        lock(&self.launches).push(LaunchRecord {
            kind: request.kind,
            code: request.code,
            options: request.options.clone(),
            target: request.target.cloned(),
            cache_snapshot,
        });
        if self.fail {
            return Err(Error::message("launcher exploded"));
        }
        Ok(!self.refuse)
    }
}

// ── Resources ───────────────────────────────────────────────────────────────

/// Hands out `/captures/<n><suffix>` targets with `memory:<n>` locators.
/// A target resolves only after [`MemoryResources::write`].
#[derive(Default)]
pub struct MemoryResources {
    next: Mutex<u32>,
    written: Mutex<HashSet<String>>,
    targets: Mutex<Vec<CaptureTarget>>,
    grants: Mutex<Vec<String>>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the external subsystem filling the target.
    pub fn write(&self, locator: &str) {
        lock(&self.written).insert(locator.to_string());
    }

    pub fn allocated(&self) -> Vec<CaptureTarget> {
        lock(&self.targets).clone()
    }

    pub fn grants(&self) -> Vec<String> {
        lock(&self.grants).clone()
    }
}

#[async_trait]
impl ResourceResolver for MemoryResources {
    async fn allocate(&self, kind: RequestKind) -> Result<CaptureTarget> {
        let suffix = kind
            .capture_suffix()
            .ok_or_else(|| Error::message(format!("{kind} does not write a capture target")))?;
        let n = {
            let mut next = lock(&self.next);
            *next += 1;
            *next
        };
        let target = CaptureTarget {
            path: PathBuf::from(format!("/captures/{n}{suffix}")),
            locator: format!("memory:{n}"),
        };
        lock(&self.targets).push(target.clone());
        Ok(target)
    }

    async fn grant_access(&self, target: &CaptureTarget) -> Result<()> {
        lock(&self.grants).push(target.locator.clone());
        Ok(())
    }

    async fn resolve(&self, locator: &str) -> Result<Option<PathBuf>> {
        if !lock(&self.written).contains(locator) {
            return Ok(None);
        }
        Ok(lock(&self.targets)
            .iter()
            .find(|t| t.locator == locator)
            .map(|t| t.path.clone()))
    }
}
