// Recognition engine boundary
// Hosts wrap their streaming recogniser behind EngineHandle and push events
// through a RecognitionEventSender that is bound to one session generation.

use super::controller::ControllerMessage;
use tokio::sync::mpsc::UnboundedSender;

/// One item of the engine's event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Engine armed; informational only
    Ready,
    /// Non-final hypothesis; may arrive many times
    PartialResult(String),
    /// Terminal success
    FinalResult(String),
    /// Terminal: engine finished cleanly without recognising anything
    NoSpeech,
    /// Terminal failure with the host's error code
    Error(i32),
}

impl RecognitionEvent {
    /// Whether the stream closes after this event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecognitionEvent::FinalResult(_) | RecognitionEvent::NoSpeech | RecognitionEvent::Error(_)
        )
    }

    /// Build a partial from a host hypothesis list (best first)
    pub fn partial_from_hypotheses(hypotheses: &[String]) -> Self {
        RecognitionEvent::PartialResult(best_hypothesis(hypotheses))
    }

    /// Build a final result from a host hypothesis list (best first)
    pub fn final_from_hypotheses(hypotheses: &[String]) -> Self {
        RecognitionEvent::FinalResult(best_hypothesis(hypotheses))
    }
}

/// Trimmed first hypothesis, or empty when the host sent none
pub fn best_hypothesis(hypotheses: &[String]) -> String {
    hypotheses
        .first()
        .map(|h| h.trim().to_string())
        .unwrap_or_default()
}

/// Human-readable label for common recogniser error codes
///
/// Codes follow the Android `SpeechRecognizer.ERROR_*` numbering, which the
/// iOS binding maps onto as well.
pub fn describe_error_code(code: i32) -> &'static str {
    match code {
        1 => "network timeout",
        2 => "network error",
        3 => "audio recording error",
        4 => "server error",
        5 => "client error",
        6 => "speech timeout",
        7 => "no match",
        8 => "recognizer busy",
        9 => "insufficient permissions",
        10 => "too many requests",
        11 => "server disconnected",
        12 => "language not supported",
        13 => "language unavailable",
        _ => "unknown error",
    }
}

/// Parameters for starting an engine instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    /// BCP 47 locale; None means the host default
    pub locale: Option<String>,
    /// Ask for partial hypotheses
    pub partial_results: bool,
}

/// Producer side of an engine's event stream
///
/// Bound to the generation of the session that started the engine. Safe to
/// clone and move to any thread: events are handed to the controller's task
/// by message passing. Events sent after the session finalized are dropped
/// by the controller.
#[derive(Debug, Clone)]
pub struct RecognitionEventSender {
    generation: u64,
    mailbox: UnboundedSender<ControllerMessage>,
}

impl RecognitionEventSender {
    pub(crate) fn new(generation: u64, mailbox: UnboundedSender<ControllerMessage>) -> Self {
        Self {
            generation,
            mailbox,
        }
    }

    /// Generation of the session this engine belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Push an event to the controller
    ///
    /// Returns false once the controller has shut down.
    pub fn send(&self, event: RecognitionEvent) -> bool {
        self.mailbox
            .send(ControllerMessage::Engine {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Error returned when an engine cannot be started
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct EngineStartError(pub String);

/// Control surface of one started engine instance
pub trait EngineHandle: Send {
    /// Graceful stop; a final result may still arrive
    fn stop(&mut self);

    /// Immediate stop; any in-flight result is discarded
    fn cancel(&mut self);

    /// Release native resources. Must be idempotent.
    fn destroy(&mut self);
}

/// Factory for engine instances
pub trait RecognitionEngineAdapter: Send + Sync {
    /// Start a new engine that reports through `events`
    ///
    /// # Errors
    /// Returns `EngineStartError` when the host recogniser cannot be created
    /// or refuses to listen.
    fn start(
        &self,
        request: &RecognitionRequest,
        events: RecognitionEventSender,
    ) -> Result<Box<dyn EngineHandle>, EngineStartError>;
}

/// Exclusive owner of a started engine
///
/// `release` cancels and destroys the engine once; dropping an unreleased
/// owner releases it too, so no code path can leak a running recogniser.
pub(crate) struct OwnedEngine {
    handle: Box<dyn EngineHandle>,
    released: bool,
}

impl OwnedEngine {
    pub(crate) fn new(handle: Box<dyn EngineHandle>) -> Self {
        Self {
            handle,
            released: false,
        }
    }

    /// Graceful stop without releasing
    pub(crate) fn stop(&mut self) {
        if !self.released {
            self.handle.stop();
        }
    }

    pub(crate) fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.handle.cancel();
        self.handle.destroy();
    }
}

impl Drop for OwnedEngine {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
pub(crate) mod tests;
