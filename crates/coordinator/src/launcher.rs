//! Handing a request to the external picker or camera.

use async_trait::async_trait;

use crate::{
    Result,
    resource::CaptureTarget,
    types::{RequestKind, RequestOptions},
};

/// Everything the external subsystem needs for one request.
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub kind: RequestKind,
    /// Code the result must carry when it comes back.
    pub code: u32,
    pub options: &'a RequestOptions,
    /// Borrowed; the coordinator keeps ownership of the target.
    pub target: Option<&'a CaptureTarget>,
}

#[async_trait]
pub trait ExternalActionLauncher: Send + Sync {
    /// Cheap availability check made before any resource is allocated.
    fn resolve_handler(&self, kind: RequestKind) -> bool;

    /// Start the external flow. `Ok(false)` means nothing on the host could
    /// take the request. The result arrives later as a
    /// [`HostEvent::ExternalResult`](crate::types::HostEvent::ExternalResult).
    async fn launch(&self, request: LaunchRequest<'_>) -> Result<bool>;
}
