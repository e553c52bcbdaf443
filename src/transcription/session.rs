// One transcription attempt, from entry to its single outcome
//
// A Session is created per attempt and owns everything the attempt uses:
// the engine, both timers, the pending permission request and the caller's
// sink. finalize() releases all of it before handing the sink back.

use super::engine::{EngineHandle, OwnedEngine, RecognitionEvent};
use super::error::{TranscriptionError, TranscriptionOutcome};
use super::sink::ResultSink;
use super::timer::{TimerKind, TimerService};
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Created, nothing requested yet
    #[default]
    Idle,
    /// Waiting for the host's permission answer
    AwaitingPermission,
    /// Engine running, timers armed
    Listening,
    /// Outcome decided and resources released
    Finalized,
}

/// What ended a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Engine delivered a final result
    FinalResult,
    /// Engine finished without recognising anything
    NoSpeech,
    /// Engine reported an error
    EngineError,
    /// No new partial within the silence timeout
    SilenceTimeout,
    /// Hard deadline reached
    HardTimeout,
    /// Host refused the microphone
    PermissionDenied,
    /// Host could not present a prompt or run the engine
    EnvironmentUnavailable,
    /// Engine could not be started
    EngineStartFailed,
    /// Host reset or teardown
    Shutdown,
}

/// Everything the controller needs after a session finalizes
#[derive(Debug)]
pub struct Finalization {
    pub session_id: Uuid,
    pub outcome: TranscriptionOutcome,
    pub reason: FinishReason,
    pub elapsed: Duration,
    pub sink: ResultSink,
}

/// State of one transcription attempt
pub struct Session {
    id: Uuid,
    generation: u64,
    state: SessionState,
    latest_partial: Option<String>,
    has_finished: bool,
    engine: Option<OwnedEngine>,
    timers: TimerService,
    permission_request: Option<JoinHandle<()>>,
    sink: Option<ResultSink>,
    created_at: Instant,
}

impl Session {
    /// Create a new session in Idle state
    pub fn new(generation: u64, sink: ResultSink) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation,
            state: SessionState::Idle,
            latest_partial: None,
            has_finished: false,
            engine: None,
            timers: TimerService::new(),
            permission_request: None,
            sink: Some(sink),
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn has_finished(&self) -> bool {
        self.has_finished
    }

    /// Latest non-empty partial, already trimmed
    pub fn latest_partial(&self) -> Option<&str> {
        self.latest_partial.as_deref()
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn timers(&self) -> &TimerService {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut TimerService {
        &mut self.timers
    }

    /// Idle -> AwaitingPermission
    ///
    /// `request` is the task waiting on the host prompt, if one was needed.
    /// It is aborted if the session finalizes first.
    pub fn await_permission(&mut self, request: Option<JoinHandle<()>>) {
        if self.state != SessionState::Idle {
            crate::warn!("Session {} asked for permission in {:?}", self.id, self.state);
            return;
        }
        self.state = SessionState::AwaitingPermission;
        self.permission_request = request;
    }

    /// AwaitingPermission -> Listening
    ///
    /// Takes ownership of the started engine and arms the hard timeout.
    pub fn start_listening(&mut self, engine: Box<dyn EngineHandle>, hard_timeout: Duration) {
        // The permission task already delivered its answer
        self.permission_request = None;
        self.engine = Some(OwnedEngine::new(engine));
        self.timers.schedule(TimerKind::HardTimeout, hard_timeout);
        self.state = SessionState::Listening;
    }

    /// Record a partial hypothesis
    ///
    /// Empty (after trimming) partials are ignored. A non-empty one replaces
    /// the stored text and re-arms the silence timer. Returns whether the
    /// partial was accepted.
    pub fn record_partial(&mut self, text: &str, silence_timeout: Duration) -> bool {
        if self.state != SessionState::Listening {
            return false;
        }
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.latest_partial = Some(text.to_string());
        self.timers.schedule(TimerKind::Silence, silence_timeout);
        true
    }

    fn best_partial(&self) -> Option<String> {
        self.latest_partial
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }

    /// Outcome for a terminal engine event
    ///
    /// Returns None for non-terminal events.
    pub fn outcome_for_event(
        &self,
        event: &RecognitionEvent,
    ) -> Option<(TranscriptionOutcome, FinishReason)> {
        let resolved = match event {
            RecognitionEvent::Ready | RecognitionEvent::PartialResult(_) => return None,
            // A final result is delivered as-is, even when empty
            RecognitionEvent::FinalResult(text) => {
                (Ok(text.trim().to_string()), FinishReason::FinalResult)
            }
            RecognitionEvent::NoSpeech => match self.best_partial() {
                Some(partial) => (Ok(partial), FinishReason::NoSpeech),
                None => (Err(TranscriptionError::NoSpeechDetected), FinishReason::NoSpeech),
            },
            RecognitionEvent::Error(code) => match self.best_partial() {
                Some(partial) => (Ok(partial), FinishReason::EngineError),
                None => (Err(TranscriptionError::EngineError(*code)), FinishReason::EngineError),
            },
        };
        Some(resolved)
    }

    /// Outcome for a fired timer
    pub fn outcome_for_timer(&self, kind: TimerKind) -> (TranscriptionOutcome, FinishReason) {
        match kind {
            TimerKind::Silence => match self.best_partial() {
                Some(partial) => (Ok(partial), FinishReason::SilenceTimeout),
                // Silence is only armed by a non-empty partial
                None => (Err(TranscriptionError::NoSpeechDetected), FinishReason::SilenceTimeout),
            },
            TimerKind::HardTimeout => match self.best_partial() {
                Some(partial) => (Ok(partial), FinishReason::HardTimeout),
                None => (Err(TranscriptionError::Timeout), FinishReason::HardTimeout),
            },
        }
    }

    /// Decide the outcome and release every resource
    ///
    /// The first call wins; later calls return None. Timers are cancelled,
    /// the engine is cancelled and destroyed, and any pending permission
    /// request is aborted before the sink is handed back for delivery.
    pub fn finalize(
        &mut self,
        outcome: TranscriptionOutcome,
        reason: FinishReason,
    ) -> Option<Finalization> {
        if self.has_finished {
            crate::debug!(
                "Session {} already finalized, ignoring {:?}",
                self.id,
                reason
            );
            return None;
        }
        self.has_finished = true;

        self.timers.cancel_all();
        if let Some(mut engine) = self.engine.take() {
            if reason == FinishReason::Shutdown {
                engine.stop();
            }
            engine.release();
        }
        if let Some(request) = self.permission_request.take() {
            request.abort();
        }
        self.state = SessionState::Finalized;

        let sink = self.sink.take()?;
        Some(Finalization {
            session_id: self.id,
            outcome,
            reason,
            elapsed: self.created_at.elapsed(),
            sink,
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("generation", &self.generation)
            .field("state", &self.state)
            .field("latest_partial", &self.latest_partial)
            .field("has_finished", &self.has_finished)
            .field("has_engine", &self.engine.is_some())
            .field("timers", &self.timers)
            .finish()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
