// Transcription session controller
//
// One tokio task owns the session slot. Every callback that can touch the
// session (entry requests, permission answers, engine events, timer fires)
// is handed to that task as a message or polled on it, so session state is
// never shared across threads.

use super::engine::{describe_error_code, RecognitionEngineAdapter, RecognitionEvent, RecognitionEventSender, RecognitionRequest};
use super::error::{TranscriptionError, TranscriptionOutcome};
use super::permission::{PermissionError, PermissionGate};
use super::session::{Finalization, FinishReason, Session, SessionState};
use super::sink::ResultSink;
use super::timer::TimerKind;
use crate::config::TranscriptionConfig;
use crate::events::{
    current_timestamp, NoopEmitter, SessionEventEmitter, TranscriptionCompletedPayload,
    TranscriptionErrorPayload, TranscriptionStartedPayload,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Messages processed on the controller task
#[derive(Debug)]
pub(crate) enum ControllerMessage {
    /// Start a session (the active slot is already claimed)
    Transcribe { sink: ResultSink },
    /// Answer from the permission gate for a session generation
    PermissionResolved {
        generation: u64,
        result: Result<bool, PermissionError>,
    },
    /// Event from an engine started for a session generation
    Engine {
        generation: u64,
        event: RecognitionEvent,
    },
    /// Finalize the live session and keep running
    Reset { done: Option<oneshot::Sender<()>> },
    /// Finalize the live session and stop the task
    Shutdown { done: Option<oneshot::Sender<()>> },
}

/// Builder for [`TranscriptionController`]
pub struct ControllerBuilder {
    config: TranscriptionConfig,
    permission: Arc<dyn PermissionGate>,
    engine: Arc<dyn RecognitionEngineAdapter>,
    emitter: Arc<dyn SessionEventEmitter>,
}

impl ControllerBuilder {
    /// Set timing and locale configuration (builder pattern)
    pub fn with_config(mut self, config: TranscriptionConfig) -> Self {
        self.config = config;
        self
    }

    /// Add lifecycle event emitter (builder pattern)
    pub fn with_emitter(mut self, emitter: Arc<dyn SessionEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Spawn the controller task on the current Tokio runtime
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(self) -> TranscriptionController {
        self.spawn_on(&tokio::runtime::Handle::current())
    }

    /// Spawn the controller task on the given runtime
    pub fn spawn_on(self, runtime: &tokio::runtime::Handle) -> TranscriptionController {
        let (mailbox_tx, mailbox_rx) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(false));

        let task = ControllerTask {
            config: self.config,
            permission: self.permission,
            engine: self.engine,
            emitter: self.emitter,
            mailbox_tx: mailbox_tx.clone(),
            mailbox: mailbox_rx,
            active: active.clone(),
            session: None,
            next_generation: 0,
        };
        let handle = runtime.spawn(task.run());

        TranscriptionController {
            mailbox: mailbox_tx,
            active,
            task: parking_lot::Mutex::new(Some(handle)),
        }
    }
}

/// Handle to the transcription controller task
///
/// Send + Sync; share it behind an Arc. Dropping the handle shuts the task
/// down, finalizing any live session with `EnvironmentUnavailable`.
pub struct TranscriptionController {
    mailbox: UnboundedSender<ControllerMessage>,
    active: Arc<AtomicBool>,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl TranscriptionController {
    /// Start building a controller from its two host collaborators
    pub fn builder(
        permission: Arc<dyn PermissionGate>,
        engine: Arc<dyn RecognitionEngineAdapter>,
    ) -> ControllerBuilder {
        ControllerBuilder {
            config: TranscriptionConfig::default(),
            permission,
            engine,
            emitter: Arc::new(NoopEmitter),
        }
    }

    /// Whether a session currently occupies the slot
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Begin a transcription; the outcome arrives once through `sink`
    ///
    /// Returns immediately. If a session is already in flight the sink gets
    /// `AlreadyInProgress` right away and the running session is untouched.
    pub fn transcript_with_sink(&self, sink: ResultSink) {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            crate::warn!("transcript requested while a session is in flight; rejecting");
            sink.deliver(Err(TranscriptionError::AlreadyInProgress));
            return;
        }

        if let Err(mpsc::error::SendError(message)) =
            self.mailbox.send(ControllerMessage::Transcribe { sink })
        {
            crate::error!("Transcription controller is not running");
            self.active.store(false, Ordering::SeqCst);
            if let ControllerMessage::Transcribe { sink } = message {
                sink.deliver(Err(TranscriptionError::EnvironmentUnavailable));
            }
        }
    }

    /// Begin a transcription and wait for its single outcome
    pub async fn transcript(&self) -> TranscriptionOutcome {
        let (sink, rx) = ResultSink::channel();
        self.transcript_with_sink(sink);
        rx.await
            .unwrap_or(Err(TranscriptionError::EnvironmentUnavailable))
    }

    /// Finalize the live session (if any) with `EnvironmentUnavailable`
    ///
    /// Host reset hook; the controller stays usable afterwards.
    pub async fn reset(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .mailbox
            .send(ControllerMessage::Reset { done: Some(done_tx) })
            .is_ok()
        {
            let _ = done_rx.await;
        }
    }

    /// Finalize the live session and stop the controller task
    ///
    /// Later `transcript` calls resolve with `EnvironmentUnavailable`.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .mailbox
            .send(ControllerMessage::Shutdown { done: Some(done_tx) })
            .is_ok()
        {
            let _ = done_rx.await;
        }
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                crate::warn!("Transcription controller task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for TranscriptionController {
    /// Ask the task to finalize and exit; ignore errors if it already has
    fn drop(&mut self) {
        let _ = self.mailbox.send(ControllerMessage::Shutdown { done: None });
    }
}

/// The execution context that owns the session
struct ControllerTask {
    config: TranscriptionConfig,
    permission: Arc<dyn PermissionGate>,
    engine: Arc<dyn RecognitionEngineAdapter>,
    emitter: Arc<dyn SessionEventEmitter>,
    /// Handed to engines and permission requests so they can report back
    mailbox_tx: UnboundedSender<ControllerMessage>,
    mailbox: UnboundedReceiver<ControllerMessage>,
    active: Arc<AtomicBool>,
    session: Option<Session>,
    next_generation: u64,
}

/// Wait for the live session's next timer; pending forever without one
async fn next_timer(session: &mut Option<Session>) -> TimerKind {
    match session {
        Some(session) => session.timers_mut().fired().await,
        None => std::future::pending().await,
    }
}

impl ControllerTask {
    #[cfg_attr(coverage_nightly, coverage(off))]
    async fn run(mut self) {
        crate::debug!("Transcription controller started");
        loop {
            // Messages first: an engine event that is ready in the same tick
            // as a timer is handled before the timer
            tokio::select! {
                biased;
                message = self.mailbox.recv() => {
                    let Some(message) = message else { break };
                    if !self.handle_message(message) {
                        break;
                    }
                }
                kind = next_timer(&mut self.session) => self.on_timer(kind),
            }
        }
        self.finalize(
            Err(TranscriptionError::EnvironmentUnavailable),
            FinishReason::Shutdown,
        );
        self.drain_mailbox();
        crate::info!("Transcription controller exiting");
    }

    /// Answer requests queued behind the shutdown; later sends fail at entry
    fn drain_mailbox(&mut self) {
        self.mailbox.close();
        while let Ok(message) = self.mailbox.try_recv() {
            match message {
                ControllerMessage::Transcribe { sink } => {
                    crate::debug!("Rejecting transcript queued behind shutdown");
                    sink.deliver(Err(TranscriptionError::EnvironmentUnavailable));
                }
                ControllerMessage::Reset { done } | ControllerMessage::Shutdown { done } => {
                    if let Some(done) = done {
                        let _ = done.send(());
                    }
                }
                ControllerMessage::PermissionResolved { .. } | ControllerMessage::Engine { .. } => {}
            }
        }
        self.active.store(false, Ordering::SeqCst);
    }

    /// Returns false when the task should stop
    fn handle_message(&mut self, message: ControllerMessage) -> bool {
        match message {
            ControllerMessage::Transcribe { sink } => self.begin_session(sink),
            ControllerMessage::PermissionResolved { generation, result } => {
                self.on_permission(generation, result)
            }
            ControllerMessage::Engine { generation, event } => {
                self.on_engine_event(generation, event)
            }
            ControllerMessage::Reset { done } => {
                crate::debug!("Reset requested");
                self.finalize(
                    Err(TranscriptionError::EnvironmentUnavailable),
                    FinishReason::Shutdown,
                );
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            ControllerMessage::Shutdown { done } => {
                crate::debug!("Shutdown requested");
                self.finalize(
                    Err(TranscriptionError::EnvironmentUnavailable),
                    FinishReason::Shutdown,
                );
                if let Some(done) = done {
                    let _ = done.send(());
                }
                return false;
            }
        }
        true
    }

    fn current_generation(&self) -> Option<u64> {
        self.session.as_ref().map(Session::generation)
    }

    fn begin_session(&mut self, sink: ResultSink) {
        if self.session.is_some() {
            // The entry slot makes this unreachable; keep the live session intact
            crate::warn!("Transcribe message while a session is live; rejecting");
            sink.deliver(Err(TranscriptionError::AlreadyInProgress));
            return;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let session = Session::new(generation, sink);
        crate::info!("transcript() session {} (generation {})", session.id(), generation);
        self.session = Some(session);

        if self.permission.has_capability() {
            if let Some(session) = self.session.as_mut() {
                session.await_permission(None);
            }
            self.start_listening();
            return;
        }

        crate::debug!("Microphone capability missing, requesting");
        let gate = self.permission.clone();
        let mailbox = self.mailbox_tx.clone();
        let request = tokio::spawn(async move {
            let result = gate.request_capability().await;
            // Mailbox closed means the controller is gone
            let _ = mailbox.send(ControllerMessage::PermissionResolved { generation, result });
        });
        if let Some(session) = self.session.as_mut() {
            session.await_permission(Some(request));
        }
    }

    fn on_permission(&mut self, generation: u64, result: Result<bool, PermissionError>) {
        let awaiting = self.session.as_ref().is_some_and(|s| {
            s.generation() == generation && s.state() == SessionState::AwaitingPermission
        });
        if !awaiting {
            crate::debug!("Dropping permission result for stale generation {}", generation);
            return;
        }

        match result {
            Ok(true) => {
                crate::info!("Microphone permission granted");
                self.start_listening();
            }
            Ok(false) => {
                crate::warn!("Microphone permission denied");
                self.finalize(
                    Err(TranscriptionError::PermissionDenied),
                    FinishReason::PermissionDenied,
                );
            }
            Err(e) => {
                crate::warn!("Permission request failed: {}", e);
                self.finalize(
                    Err(TranscriptionError::EnvironmentUnavailable),
                    FinishReason::EnvironmentUnavailable,
                );
            }
        }
    }

    fn start_listening(&mut self) {
        let Some(generation) = self.current_generation() else {
            return;
        };
        let request = RecognitionRequest {
            locale: self.config.locale.clone(),
            partial_results: self.config.partial_results,
        };
        let events = RecognitionEventSender::new(generation, self.mailbox_tx.clone());

        crate::debug!("Starting recognition engine (locale={:?})", request.locale);
        match self.engine.start(&request, events) {
            Ok(engine) => {
                let hard_timeout = self.config.hard_timeout();
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                session.start_listening(engine, hard_timeout);
                crate::info!("Listening (hard timeout {:?})", hard_timeout);
                self.emitter
                    .emit_transcription_started(TranscriptionStartedPayload {
                        session_id: session.id().to_string(),
                        timestamp: current_timestamp(),
                    });
            }
            Err(e) => {
                crate::error!("Failed to start recognition: {}", e);
                self.finalize(
                    Err(TranscriptionError::EngineUnavailable(e.0)),
                    FinishReason::EngineStartFailed,
                );
            }
        }
    }

    fn on_engine_event(&mut self, generation: u64, event: RecognitionEvent) {
        let silence_timeout = self.config.silence_timeout();
        let Some(session) = self.session.as_mut() else {
            crate::debug!("Dropping engine event {:?}: no live session", event);
            return;
        };
        if session.generation() != generation || session.state() != SessionState::Listening {
            crate::debug!(
                "Dropping engine event {:?} from generation {} (current {})",
                event,
                generation,
                session.generation()
            );
            return;
        }

        match &event {
            RecognitionEvent::Ready => crate::debug!("Engine ready for speech"),
            RecognitionEvent::PartialResult(text) => {
                if session.record_partial(text, silence_timeout) {
                    crate::debug!("Partial result: '{}'", text.trim());
                }
            }
            RecognitionEvent::Error(code) => {
                crate::warn!("Engine error {} ({})", code, describe_error_code(*code));
            }
            RecognitionEvent::FinalResult(_) | RecognitionEvent::NoSpeech => {}
        }

        if let Some((outcome, reason)) = session.outcome_for_event(&event) {
            self.finalize(outcome, reason);
        }
    }

    fn on_timer(&mut self, kind: TimerKind) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        match kind {
            TimerKind::Silence => crate::debug!(
                "Silence timeout, finishing with partial: '{}'",
                session.latest_partial().unwrap_or_default()
            ),
            TimerKind::HardTimeout => crate::warn!("Hard timeout reached"),
        }
        let (outcome, reason) = session.outcome_for_timer(kind);
        self.finalize(outcome, reason);
    }

    /// Single finalize path: release resources, free the slot, deliver once
    fn finalize(&mut self, outcome: TranscriptionOutcome, reason: FinishReason) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let Some(finalization) = session.finalize(outcome, reason) else {
            return;
        };
        drop(session);
        self.active.store(false, Ordering::SeqCst);
        self.report(&finalization);

        let Finalization { outcome, sink, .. } = finalization;
        sink.deliver(outcome);
    }

    fn report(&self, finalization: &Finalization) {
        let duration_ms = finalization.elapsed.as_millis() as u64;
        let session_id = finalization.session_id.to_string();
        match &finalization.outcome {
            Ok(text) => {
                crate::info!(
                    "Session {} finished ({:?}) in {}ms: {} chars",
                    session_id,
                    finalization.reason,
                    duration_ms,
                    text.len()
                );
                self.emitter
                    .emit_transcription_completed(TranscriptionCompletedPayload {
                        session_id,
                        text: text.clone(),
                        reason: finalization.reason,
                        duration_ms,
                    });
            }
            Err(e) => {
                crate::info!(
                    "Session {} failed ({:?}) in {}ms: {}",
                    session_id,
                    finalization.reason,
                    duration_ms,
                    e
                );
                self.emitter.emit_transcription_error(TranscriptionErrorPayload {
                    session_id,
                    error: e.to_string(),
                    reason: finalization.reason,
                    duration_ms,
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
