// AI bridge: text answering, speech transcription and speech synthesis for
// scripted mobile hosts.

// Enable coverage attribute on nightly for explicit exclusions
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod answer;
pub mod bridge;
pub mod config;
pub mod constants;
pub mod events;
pub mod synthesis;
pub mod transcription;

#[cfg(feature = "tauri")]
pub mod plugin;

// Re-export log macros for use throughout the crate
pub use log::{debug, error, info, trace, warn};

pub use answer::{AnswerBackend, AnswerError, Answerer, FallbackAnswerBackend};
pub use bridge::{Bridge, BridgeBuilder, BridgeCommand, BridgeError, BridgeResponse};
pub use config::{BridgeConfig, ConfigError};
pub use events::SessionEventEmitter;
pub use synthesis::{SpeechBackend, SpeechSynthesizer, SynthesisError};
pub use transcription::{
    PermissionGate, RecognitionEngineAdapter, RecognitionEvent, TranscriptionController,
    TranscriptionError,
};
