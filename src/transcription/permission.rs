// Microphone capability gate
// Hosts query the capability synchronously and request it asynchronously

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;

/// Errors from a capability request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// The host has no foreground context to present a prompt in
    #[error("Permission prompt unavailable: no foreground context")]
    EnvironmentUnavailable,
    /// Another request is still waiting for the host's answer
    #[error("A permission request is already pending")]
    RequestPending,
}

/// Trait for microphone capability checks
/// Allows mocking in tests while using platform prompts in production
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Whether the capability is already granted
    fn has_capability(&self) -> bool;

    /// Ask the host for the capability; resolves once with grant/deny
    ///
    /// No timeout is applied: the future stays pending until the host answers.
    async fn request_capability(&self) -> Result<bool, PermissionError>;
}

/// Gate with a fixed answer, for hosts without runtime permissions
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissionGate {
    granted: bool,
}

impl StaticPermissionGate {
    pub fn granted() -> Self {
        Self { granted: true }
    }

    pub fn denied() -> Self {
        Self { granted: false }
    }
}

#[async_trait]
impl PermissionGate for StaticPermissionGate {
    fn has_capability(&self) -> bool {
        self.granted
    }

    async fn request_capability(&self) -> Result<bool, PermissionError> {
        Ok(self.granted)
    }
}

/// Hook that shows the host's permission prompt
///
/// Returns `EnvironmentUnavailable` when there is nothing to show it in.
pub type PromptHook = Box<dyn Fn() -> Result<(), PermissionError> + Send + Sync>;

/// Gate for hosts that split the prompt from its result
///
/// `request_capability` fires the prompt hook and parks until the host calls
/// [`PromptPermissionGate::on_permission_result`]. Only one request may be
/// outstanding. A grant is remembered for later `has_capability` checks.
pub struct PromptPermissionGate {
    granted: AtomicBool,
    prompt: PromptHook,
    pending: Mutex<Option<oneshot::Sender<bool>>>,
}

impl PromptPermissionGate {
    /// Create a gate that has not been granted yet
    pub fn new(prompt: PromptHook) -> Self {
        Self {
            granted: AtomicBool::new(false),
            prompt,
            pending: Mutex::new(None),
        }
    }

    /// Seed the granted flag from the host's current permission state
    pub fn with_granted(self, granted: bool) -> Self {
        self.granted.store(granted, Ordering::SeqCst);
        self
    }

    /// Deliver the host's answer to the outstanding request
    ///
    /// Returns false if no request was waiting (late or duplicate answer).
    pub fn on_permission_result(&self, granted: bool) -> bool {
        if granted {
            self.granted.store(true, Ordering::SeqCst);
        }
        let waiting = self.pending.lock().take();
        match waiting {
            Some(tx) => tx.send(granted).is_ok(),
            None => {
                crate::debug!("Permission result {} arrived with no pending request", granted);
                false
            }
        }
    }

    /// Whether a request is waiting for the host
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[async_trait]
impl PermissionGate for PromptPermissionGate {
    fn has_capability(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    async fn request_capability(&self) -> Result<bool, PermissionError> {
        let rx = {
            let mut pending = self.pending.lock();
            // A closed sender belongs to a requester that gave up
            if pending.as_ref().is_some_and(|tx| !tx.is_closed()) {
                return Err(PermissionError::RequestPending);
            }
            let (tx, rx) = oneshot::channel();
            *pending = Some(tx);
            rx
        };

        // Lock released: the hook may answer synchronously
        if let Err(e) = (self.prompt)() {
            self.pending.lock().take();
            return Err(e);
        }

        rx.await.map_err(|_| PermissionError::EnvironmentUnavailable)
    }
}

#[cfg(test)]
#[path = "permission_test.rs"]
mod tests;
