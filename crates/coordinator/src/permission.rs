//! Host permission checks.

use std::{
    collections::HashSet,
    sync::Mutex,
};

use {
    async_trait::async_trait,
    picker_config::{PermissionsConfig, PromptAnswer},
    tracing::{debug, info},
};

use crate::{
    Result,
    error::Error,
    types::{Capability, HostEvent, HostEventSender},
};

#[async_trait]
pub trait PermissionGate: Send + Sync {
    fn is_granted(&self, capability: Capability) -> bool;

    /// Whether the host requires an explicit grant at all. Capabilities the
    /// host never declared are implicitly available.
    fn needs_explicit_grant(&self, capability: Capability) -> bool;

    /// Ask for `capability`. The answer arrives later, at most once, as a
    /// [`HostEvent::PermissionResult`] carrying `code`.
    async fn request(&self, capability: Capability, code: u32) -> Result<()>;
}

/// Answers prompts from configuration and posts the answer on the host
/// event channel.
pub struct PolicyPermissionGate {
    granted: Mutex<HashSet<Capability>>,
    explicit: HashSet<Capability>,
    answer: PromptAnswer,
    events: HostEventSender,
}

impl PolicyPermissionGate {
    pub fn new(config: &PermissionsConfig, events: HostEventSender) -> Self {
        Self {
            granted: Mutex::new(config.granted.iter().copied().map(Capability::from).collect()),
            explicit: config.explicit.iter().copied().map(Capability::from).collect(),
            answer: config.prompt,
            events,
        }
    }
}

#[async_trait]
impl PermissionGate for PolicyPermissionGate {
    fn is_granted(&self, capability: Capability) -> bool {
        self.granted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&capability)
    }

    fn needs_explicit_grant(&self, capability: Capability) -> bool {
        self.explicit.contains(&capability)
    }

    async fn request(&self, capability: Capability, code: u32) -> Result<()> {
        let granted = self.answer == PromptAnswer::Grant;
        if granted {
            self.granted
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(capability);
        }
        info!(capability = %capability, granted, "answered permission prompt");
        self.events
            .send(HostEvent::PermissionResult { code, granted })
            .map_err(|_| Error::message("host event channel closed"))?;
        debug!(code, "posted permission result");
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, picker_config::CapabilityName, tokio::sync::mpsc};

    fn config(prompt: PromptAnswer) -> PermissionsConfig {
        PermissionsConfig {
            granted: vec![CapabilityName::Photos],
            explicit: vec![CapabilityName::Photos, CapabilityName::Camera],
            prompt,
        }
    }

    #[tokio::test]
    async fn grant_prompt_posts_event_and_remembers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gate = PolicyPermissionGate::new(&config(PromptAnswer::Grant), tx);
        assert!(gate.is_granted(Capability::Photos));
        assert!(!gate.is_granted(Capability::Camera));

        gate.request(Capability::Camera, 2345).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), HostEvent::PermissionResult {
            code: 2345,
            granted: true,
        });
        assert!(gate.is_granted(Capability::Camera));
    }

    #[tokio::test]
    async fn deny_prompt_posts_denial() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gate = PolicyPermissionGate::new(&config(PromptAnswer::Deny), tx);
        gate.request(Capability::Camera, 2355).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), HostEvent::PermissionResult {
            code: 2355,
            granted: false,
        });
        assert!(!gate.is_granted(Capability::Camera));
    }

    #[test]
    fn undeclared_capability_needs_no_grant() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let gate = PolicyPermissionGate::new(
            &PermissionsConfig {
                explicit: vec![CapabilityName::Photos],
                ..Default::default()
            },
            tx,
        );
        assert!(gate.needs_explicit_grant(Capability::Photos));
        assert!(!gate.needs_explicit_grant(Capability::Camera));
    }
}
