// Speech synthesis gate
//
// The backend is brought up lazily on the first speak request. While it is
// initializing, at most one request is parked; a newer request replaces it.

use super::backend::{SpeechBackend, SpeechBackendError};
use crate::config::SynthesisConfig;
use crate::constants::UTTERANCE_ID_PREFIX;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Reply sent when an utterance has been handed to the backend
pub const SPEAKING_STARTED: &str = "Speaking started.";

/// Errors returned to speak callers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("Text to speak is required.")]
    TextRequired,
    /// The backend came up but cannot speak the configured locale
    #[error("TTS language data missing or not supported.")]
    LanguageUnavailable,
    #[error("TTS initialization failed.")]
    InitFailed,
    /// A newer request replaced this one while the backend was initializing
    #[error("Speech request superseded.")]
    Superseded,
    /// The synthesizer was shut down while this request was parked
    #[error("Speech request cancelled.")]
    Cancelled,
    #[error("TTS error: {0}")]
    Backend(String),
}

impl Serialize for SynthesisError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<SpeechBackendError> for SynthesisError {
    fn from(err: SpeechBackendError) -> Self {
        SynthesisError::Backend(err.0)
    }
}

type SpeakReply = oneshot::Sender<Result<String, SynthesisError>>;

/// The request parked while the backend initializes
struct PendingSpeech {
    text: String,
    reply: SpeakReply,
}

impl PendingSpeech {
    fn answer(self, result: Result<String, SynthesisError>) {
        // Receiver dropped means the caller stopped waiting
        let _ = self.reply.send(result);
    }
}

enum GateState {
    Uninitialized,
    Initializing {
        attempt: u64,
        pending: Option<PendingSpeech>,
    },
    Ready,
    /// The backend is up but the locale is unusable
    LanguageUnavailable,
}

impl GateState {
    fn name(&self) -> &'static str {
        match self {
            GateState::Uninitialized => "uninitialized",
            GateState::Initializing { .. } => "initializing",
            GateState::Ready => "ready",
            GateState::LanguageUnavailable => "language_unavailable",
        }
    }
}

struct Gate {
    state: GateState,
    /// Bumped per initialize so a stale init completion is ignored
    attempts: u64,
}

struct Inner {
    backend: Arc<dyn SpeechBackend>,
    config: SynthesisConfig,
    gate: Mutex<Gate>,
}

/// Queue-of-one speech synthesizer
///
/// Cheap to clone; clones share the backend and its state.
#[derive(Clone)]
pub struct SpeechSynthesizer {
    inner: Arc<Inner>,
}

impl SpeechSynthesizer {
    pub fn new(backend: Arc<dyn SpeechBackend>, config: SynthesisConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                gate: Mutex::new(Gate {
                    state: GateState::Uninitialized,
                    attempts: 0,
                }),
            }),
        }
    }

    /// Whether the backend is initialized and speaking the configured locale
    pub fn is_ready(&self) -> bool {
        matches!(self.inner.gate.lock().state, GateState::Ready)
    }

    /// Speak `text`, resolving once the utterance has started
    ///
    /// Must be called from within a Tokio runtime (initialization runs on a
    /// spawned task so a dropped caller cannot stall it).
    pub async fn speak(&self, text: &str) -> Result<String, SynthesisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SynthesisError::TextRequired);
        }

        let rx = {
            let mut guard = self.inner.gate.lock();
            let gate = &mut *guard;
            match &mut gate.state {
                GateState::Ready => return self.inner.speak_now(text),
                GateState::LanguageUnavailable => {
                    return Err(SynthesisError::LanguageUnavailable)
                }
                GateState::Initializing { pending, .. } => {
                    let (reply, rx) = oneshot::channel();
                    let replaced = pending.replace(PendingSpeech {
                        text: text.to_string(),
                        reply,
                    });
                    if let Some(replaced) = replaced {
                        crate::debug!("Replacing parked speech request");
                        replaced.answer(Err(SynthesisError::Superseded));
                    }
                    rx
                }
                GateState::Uninitialized => {
                    let (reply, rx) = oneshot::channel();
                    gate.attempts += 1;
                    let attempt = gate.attempts;
                    gate.state = GateState::Initializing {
                        attempt,
                        pending: Some(PendingSpeech {
                            text: text.to_string(),
                            reply,
                        }),
                    };
                    crate::info!("Initializing TTS backend (attempt {})", attempt);
                    let inner = self.inner.clone();
                    tokio::spawn(async move {
                        let result = inner.backend.initialize().await;
                        inner.on_initialized(attempt, result);
                    });
                    rx
                }
            }
        };

        rx.await.unwrap_or(Err(SynthesisError::Cancelled))
    }

    /// Stop the current utterance; the backend stays initialized
    pub fn stop(&self) {
        let gate = self.inner.gate.lock();
        if !matches!(gate.state, GateState::Uninitialized) {
            self.inner.backend.stop();
        }
    }

    /// Stop and release the backend; the next speak initializes again
    ///
    /// A parked request is answered with `Cancelled`. Idempotent.
    pub fn shutdown(&self) {
        let mut gate = self.inner.gate.lock();
        let previous = std::mem::replace(&mut gate.state, GateState::Uninitialized);
        match previous {
            GateState::Uninitialized => return,
            GateState::Initializing { pending, .. } => {
                if let Some(pending) = pending {
                    pending.answer(Err(SynthesisError::Cancelled));
                }
            }
            GateState::Ready | GateState::LanguageUnavailable => {}
        }
        self.inner.backend.stop();
        self.inner.backend.shutdown();
        crate::info!("TTS backend shut down");
    }
}

impl Inner {
    /// Flush current playback and start a fresh utterance
    fn speak_now(&self, text: &str) -> Result<String, SynthesisError> {
        self.backend.stop();
        let utterance_id = format!(
            "{}{}",
            UTTERANCE_ID_PREFIX,
            chrono::Utc::now().timestamp_millis()
        );
        crate::debug!("Speaking utterance {}", utterance_id);
        self.backend.speak(text, &utterance_id)?;
        Ok(SPEAKING_STARTED.to_string())
    }

    fn on_initialized(&self, attempt: u64, result: Result<(), SpeechBackendError>) {
        let mut guard = self.gate.lock();
        let gate = &mut *guard;
        let pending = match &mut gate.state {
            GateState::Initializing {
                attempt: current,
                pending,
            } if *current == attempt => pending.take(),
            other => {
                crate::debug!(
                    "Ignoring TTS init result for attempt {} (state {})",
                    attempt,
                    other.name()
                );
                return;
            }
        };

        if let Err(e) = result {
            crate::warn!("TTS initialization failed: {}", e);
            gate.state = GateState::Uninitialized;
            self.backend.shutdown();
            if let Some(pending) = pending {
                pending.answer(Err(SynthesisError::InitFailed));
            }
            return;
        }

        let support = self.backend.set_language(self.config.locale.as_deref());
        if !support.is_available() {
            crate::warn!("TTS language unavailable: {:?}", support);
            gate.state = GateState::LanguageUnavailable;
            if let Some(pending) = pending {
                pending.answer(Err(SynthesisError::LanguageUnavailable));
            }
            return;
        }

        self.backend.set_speech_rate(self.config.speech_rate);
        self.backend.set_pitch(self.config.pitch);
        gate.state = GateState::Ready;
        crate::info!("TTS backend ready");

        if let Some(pending) = pending {
            let result = self.speak_now(&pending.text);
            pending.answer(result);
        }
    }
}

#[cfg(test)]
#[path = "synthesizer_test.rs"]
mod tests;
