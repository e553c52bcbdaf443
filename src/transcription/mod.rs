// Transcription module - one speech-to-text attempt from request to outcome

mod controller;
mod engine;
mod error;
mod permission;
mod session;
mod sink;
mod timer;

pub use controller::{ControllerBuilder, TranscriptionController};
pub use engine::{
    best_hypothesis, describe_error_code, EngineHandle, EngineStartError,
    RecognitionEngineAdapter, RecognitionEvent, RecognitionEventSender, RecognitionRequest,
};
pub use error::{TranscriptionError, TranscriptionOutcome};
pub use permission::{
    PermissionError, PermissionGate, PromptHook, PromptPermissionGate, StaticPermissionGate,
};
pub use session::{Finalization, FinishReason, Session, SessionState};
pub use sink::ResultSink;
pub use timer::{TimerHandle, TimerKind, TimerService};

#[cfg(test)]
pub(crate) use engine::tests::{EngineProbe, MockEngineAdapter};
