// Transcription lifecycle events for host notification
// Defines event payloads and emission trait for testability

use serde::Serialize;

use crate::transcription::FinishReason;

/// Event names as constants for consistency
pub mod event_names {
    pub const TRANSCRIPTION_STARTED: &str = "transcription_started";
    pub const TRANSCRIPTION_COMPLETED: &str = "transcription_completed";
    pub const TRANSCRIPTION_ERROR: &str = "transcription_error";
}

/// Payload for transcription_started event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionStartedPayload {
    /// Id of the session that started listening
    pub session_id: String,
    /// ISO 8601 timestamp when the engine was started
    pub timestamp: String,
}

/// Payload for transcription_completed event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionCompletedPayload {
    pub session_id: String,
    /// The delivered text
    pub text: String,
    /// What ended the session
    pub reason: FinishReason,
    /// Time from entry to finalization in milliseconds
    pub duration_ms: u64,
}

/// Payload for transcription_error event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionErrorPayload {
    pub session_id: String,
    /// Descriptive error message (same text the caller receives)
    pub error: String,
    pub reason: FinishReason,
    pub duration_ms: u64,
}

/// Trait for emitting transcription lifecycle events
/// Allows mocking in tests while using the Tauri AppHandle in production
pub trait SessionEventEmitter: Send + Sync {
    /// Emit transcription_started event
    fn emit_transcription_started(&self, payload: TranscriptionStartedPayload);

    /// Emit transcription_completed event
    fn emit_transcription_completed(&self, payload: TranscriptionCompletedPayload);

    /// Emit transcription_error event
    fn emit_transcription_error(&self, payload: TranscriptionErrorPayload);
}

/// Emitter for hosts that do not observe lifecycle events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEmitter;

impl SessionEventEmitter for NoopEmitter {
    fn emit_transcription_started(&self, _payload: TranscriptionStartedPayload) {}
    fn emit_transcription_completed(&self, _payload: TranscriptionCompletedPayload) {}
    fn emit_transcription_error(&self, _payload: TranscriptionErrorPayload) {}
}

/// Get the current timestamp in ISO 8601 format
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
#[path = "events_test.rs"]
pub(crate) mod tests;
