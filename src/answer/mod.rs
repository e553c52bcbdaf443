// Text answering module - replies to a free-form question

use crate::config::AnswerConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Errors returned to ask callers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("Question cannot be empty.")]
    EmptyQuestion,
    #[error("Answer backend failed: {0}")]
    Backend(String),
}

impl Serialize for AnswerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Trait for the component that produces answers
/// Allows a model backend to be plugged in; the fallback is used otherwise
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    /// Answer a non-empty, trimmed question
    async fn answer(&self, question: &str) -> Result<String, AnswerError>;
}

/// Backend that replies with a fixed answer
#[derive(Debug, Clone)]
pub struct FallbackAnswerBackend {
    reply: String,
}

impl FallbackAnswerBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }

    pub fn from_config(config: &AnswerConfig) -> Self {
        Self::new(config.fallback_answer.clone())
    }
}

#[async_trait]
impl AnswerBackend for FallbackAnswerBackend {
    async fn answer(&self, _question: &str) -> Result<String, AnswerError> {
        Ok(self.reply.clone())
    }
}

/// Validates questions and hands them to the configured backend
#[derive(Clone)]
pub struct Answerer {
    backend: Arc<dyn AnswerBackend>,
}

impl Answerer {
    pub fn new(backend: Arc<dyn AnswerBackend>) -> Self {
        Self { backend }
    }

    /// Answerer backed by [`FallbackAnswerBackend`]
    pub fn fallback(config: &AnswerConfig) -> Self {
        Self::new(Arc::new(FallbackAnswerBackend::from_config(config)))
    }

    pub async fn ask(&self, question: &str) -> Result<String, AnswerError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnswerError::EmptyQuestion);
        }
        crate::debug!("ask() called with question='{}'", question);
        self.backend.answer(question).await.inspect_err(|e| {
            crate::warn!("Answer backend failed: {}", e);
        })
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
