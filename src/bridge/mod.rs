// Bridge facade - routes scripted-caller commands to the three capabilities
// and forwards host lifecycle hooks.

mod command;

pub use command::{actions, BridgeCommand, BridgeError, BridgeResponse};

use crate::answer::{AnswerBackend, Answerer, FallbackAnswerBackend};
use crate::config::{BridgeConfig, ConfigError};
use crate::events::{NoopEmitter, SessionEventEmitter};
use crate::synthesis::{SpeechBackend, SpeechSynthesizer};
use crate::transcription::{PermissionGate, RecognitionEngineAdapter, TranscriptionController};
use serde_json::Value;
use std::sync::Arc;

/// Builder for [`Bridge`]
pub struct BridgeBuilder {
    config: BridgeConfig,
    permission: Arc<dyn PermissionGate>,
    engine: Arc<dyn RecognitionEngineAdapter>,
    speech: Arc<dyn SpeechBackend>,
    answer_backend: Option<Arc<dyn AnswerBackend>>,
    emitter: Arc<dyn SessionEventEmitter>,
}

impl BridgeBuilder {
    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the fallback answer backend (builder pattern)
    pub fn with_answer_backend(mut self, backend: Arc<dyn AnswerBackend>) -> Self {
        self.answer_backend = Some(backend);
        self
    }

    /// Add transcription lifecycle event emitter (builder pattern)
    pub fn with_emitter(mut self, emitter: Arc<dyn SessionEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Validate the config and start the bridge on the current Tokio runtime
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn build(self) -> Result<Bridge, ConfigError> {
        self.build_on(&tokio::runtime::Handle::current())
    }

    /// Validate the config and start the bridge on the given runtime
    pub fn build_on(self, runtime: &tokio::runtime::Handle) -> Result<Bridge, ConfigError> {
        self.config.validate()?;
        let BridgeConfig {
            transcription,
            synthesis,
            answer,
        } = self.config;

        let controller = TranscriptionController::builder(self.permission, self.engine)
            .with_config(transcription)
            .with_emitter(self.emitter)
            .spawn_on(runtime);
        let answer_backend: Arc<dyn AnswerBackend> = match self.answer_backend {
            Some(backend) => backend,
            None => Arc::new(FallbackAnswerBackend::from_config(&answer)),
        };

        crate::info!("AI bridge ready");
        Ok(Bridge {
            transcription: controller,
            synthesizer: SpeechSynthesizer::new(self.speech, synthesis),
            answerer: Answerer::new(answer_backend),
        })
    }
}

/// The three capabilities behind one command surface
///
/// Send + Sync; hosts typically keep it in an `Arc`.
pub struct Bridge {
    transcription: TranscriptionController,
    synthesizer: SpeechSynthesizer,
    answerer: Answerer,
}

impl Bridge {
    /// Start building a bridge from the host's platform seams
    pub fn builder(
        permission: Arc<dyn PermissionGate>,
        engine: Arc<dyn RecognitionEngineAdapter>,
        speech: Arc<dyn SpeechBackend>,
    ) -> BridgeBuilder {
        BridgeBuilder {
            config: BridgeConfig::default(),
            permission,
            engine,
            speech,
            answer_backend: None,
            emitter: Arc::new(NoopEmitter),
        }
    }

    /// Run a scripted-caller command
    ///
    /// `args` is the JSON argument array. Unknown actions fail with
    /// [`BridgeError::UnknownAction`] without touching any capability.
    pub async fn execute(&self, action: &str, args: &Value) -> Result<BridgeResponse, BridgeError> {
        let command = BridgeCommand::parse(action, args).inspect_err(|e| {
            crate::warn!("Rejected bridge command '{}': {}", action, e);
        })?;
        self.dispatch(command).await
    }

    /// Run an already parsed command
    pub async fn dispatch(&self, command: BridgeCommand) -> Result<BridgeResponse, BridgeError> {
        let action = command.action();
        let message = match command {
            BridgeCommand::Ask { question } => self.ask(&question).await?,
            BridgeCommand::Transcript => self.transcript().await?,
            BridgeCommand::Speak { text } => self.speak(&text).await?,
        };
        Ok(BridgeResponse::new(action, message))
    }

    pub async fn ask(&self, question: &str) -> Result<String, BridgeError> {
        Ok(self.answerer.ask(question).await?)
    }

    /// Listen for one utterance and return its text
    pub async fn transcript(&self) -> Result<String, BridgeError> {
        Ok(self.transcription.transcript().await?)
    }

    pub async fn speak(&self, text: &str) -> Result<String, BridgeError> {
        Ok(self.synthesizer.speak(text).await?)
    }

    pub fn transcription(&self) -> &TranscriptionController {
        &self.transcription
    }

    pub fn synthesizer(&self) -> &SpeechSynthesizer {
        &self.synthesizer
    }

    /// Host reset (e.g. page reload): stop speech and abandon any transcription
    pub async fn on_reset(&self) {
        crate::info!("Bridge reset");
        self.synthesizer.stop();
        self.transcription.reset().await;
    }

    /// Host teardown: release the TTS backend and stop the controller
    ///
    /// The bridge rejects transcription requests afterwards; speech would
    /// initialize the backend again.
    pub async fn on_destroy(&self) {
        crate::info!("Bridge destroyed");
        self.synthesizer.stop();
        self.synthesizer.shutdown();
        self.transcription.shutdown().await;
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
