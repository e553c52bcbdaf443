// Speech synthesis module - speaks text through a host TTS backend

mod backend;
mod synthesizer;

pub use backend::{LanguageSupport, SpeechBackend, SpeechBackendError};
pub use synthesizer::{SpeechSynthesizer, SynthesisError, SPEAKING_STARTED};

#[cfg(test)]
pub(crate) use backend::tests::MockSpeechBackend;
