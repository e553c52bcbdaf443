//! Tauri event emitter implementation.
//!
//! Forwards transcription lifecycle events to the webview.

use tauri::{AppHandle, Emitter, Runtime};

use crate::events::{
    event_names, SessionEventEmitter, TranscriptionCompletedPayload, TranscriptionErrorPayload,
    TranscriptionStartedPayload,
};

/// Tauri AppHandle-based event emitter for production use.
pub struct TauriSessionEmitter<R: Runtime> {
    app_handle: AppHandle<R>,
}

impl<R: Runtime> TauriSessionEmitter<R> {
    /// Create a new TauriSessionEmitter with the given AppHandle.
    pub fn new(app_handle: AppHandle<R>) -> Self {
        Self { app_handle }
    }
}

impl<R: Runtime> SessionEventEmitter for TauriSessionEmitter<R> {
    fn emit_transcription_started(&self, payload: TranscriptionStartedPayload) {
        emit_or_warn!(self.app_handle, event_names::TRANSCRIPTION_STARTED, payload);
    }

    fn emit_transcription_completed(&self, payload: TranscriptionCompletedPayload) {
        emit_or_warn!(self.app_handle, event_names::TRANSCRIPTION_COMPLETED, payload);
    }

    fn emit_transcription_error(&self, payload: TranscriptionErrorPayload) {
        emit_or_warn!(self.app_handle, event_names::TRANSCRIPTION_ERROR, payload);
    }
}
