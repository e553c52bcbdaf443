// Host text-to-speech seam

use async_trait::async_trait;

/// Failure reported by the host TTS engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SpeechBackendError(pub String);

/// Result of selecting a voice locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSupport {
    Available,
    MissingData,
    NotSupported,
}

impl LanguageSupport {
    pub fn is_available(self) -> bool {
        self == LanguageSupport::Available
    }
}

/// Trait for the host TTS engine
/// Allows mocking in tests while using the platform engine in production
///
/// `initialize` is called once before any other method, and again only after
/// `shutdown`.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Bring the engine up; resolves when the engine reports its init status
    async fn initialize(&self) -> Result<(), SpeechBackendError>;

    /// Select the voice locale (None = host default)
    fn set_language(&self, locale: Option<&str>) -> LanguageSupport;

    fn set_speech_rate(&self, rate: f32);

    fn set_pitch(&self, pitch: f32);

    /// Speak `text`, flushing anything queued
    fn speak(&self, text: &str, utterance_id: &str) -> Result<(), SpeechBackendError>;

    /// Stop the current utterance
    fn stop(&self);

    /// Release the engine
    fn shutdown(&self);
}

#[cfg(test)]
#[path = "backend_test.rs"]
pub(crate) mod tests;
