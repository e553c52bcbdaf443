// Caller-visible transcription errors

use serde::Serialize;

/// Terminal error delivered to the transcription caller
///
/// The display strings are the messages scripted callers receive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptionError {
    /// A session is already in flight; the existing one is untouched
    #[error("Recognition already in progress.")]
    AlreadyInProgress,
    /// The host cannot run the engine or show a prompt right now
    #[error("Activity unavailable.")]
    EnvironmentUnavailable,
    /// The user refused microphone access
    #[error("Microphone permission denied.")]
    PermissionDenied,
    /// The engine failed to start
    #[error("Failed to start recognition: {0}")]
    EngineUnavailable(String),
    /// The engine failed mid-session with no usable partial
    #[error("Speech error: {0}")]
    EngineError(i32),
    /// The hard deadline passed with no usable speech
    #[error("Timeout before final recognition.")]
    Timeout,
    /// The engine finished cleanly but heard nothing
    #[error("No speech detected.")]
    NoSpeechDetected,
}

impl TranscriptionError {
    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            TranscriptionError::AlreadyInProgress => "ALREADY_IN_PROGRESS",
            TranscriptionError::EnvironmentUnavailable => "ENVIRONMENT_UNAVAILABLE",
            TranscriptionError::PermissionDenied => "PERMISSION_DENIED",
            TranscriptionError::EngineUnavailable(_) => "ENGINE_UNAVAILABLE",
            TranscriptionError::EngineError(_) => "ENGINE_ERROR",
            TranscriptionError::Timeout => "TIMEOUT",
            TranscriptionError::NoSpeechDetected => "NO_SPEECH_DETECTED",
        }
    }
}

impl Serialize for TranscriptionError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// The single outcome of a transcription session
pub type TranscriptionOutcome = Result<String, TranscriptionError>;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
