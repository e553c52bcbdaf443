// Scripted-caller command parsing and the errors returned across the bridge

use crate::answer::AnswerError;
use crate::synthesis::SynthesisError;
use crate::transcription::TranscriptionError;
use serde::Serialize;
use serde_json::Value;

/// Action names understood by [`crate::bridge::Bridge::execute`]
pub mod actions {
    pub const ASK: &str = "ask";
    pub const TRANSCRIPT: &str = "transcript";
    pub const SPEAK: &str = "speak";
}

/// Errors returned to the scripted caller
///
/// Serializes as its display string, which is the caller-visible message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
}

impl Serialize for BridgeError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// A parsed bridge command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    Ask { question: String },
    Transcript,
    Speak { text: String },
}

impl BridgeCommand {
    /// Parse an action name and its JSON argument array
    ///
    /// `null` is treated as an empty array. Missing or null positional
    /// arguments read as empty strings; numbers and booleans are stringified.
    pub fn parse(action: &str, args: &Value) -> Result<Self, BridgeError> {
        let args = match args {
            Value::Null => &[][..],
            Value::Array(items) => items.as_slice(),
            other => {
                return Err(BridgeError::InvalidArguments(format!(
                    "expected a JSON array, got {}",
                    json_kind(other)
                )))
            }
        };

        match action {
            actions::ASK => Ok(BridgeCommand::Ask {
                question: string_arg(args, 0)?,
            }),
            actions::TRANSCRIPT => Ok(BridgeCommand::Transcript),
            actions::SPEAK => Ok(BridgeCommand::Speak {
                text: string_arg(args, 0)?,
            }),
            other => Err(BridgeError::UnknownAction(other.to_string())),
        }
    }

    /// The action name this command was parsed from
    pub fn action(&self) -> &'static str {
        match self {
            BridgeCommand::Ask { .. } => actions::ASK,
            BridgeCommand::Transcript => actions::TRANSCRIPT,
            BridgeCommand::Speak { .. } => actions::SPEAK,
        }
    }
}

/// Successful reply to a bridge command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    pub action: String,
    /// Answer text, transcript, or synthesis status message
    pub message: String,
}

impl BridgeResponse {
    pub fn new(action: &str, message: String) -> Self {
        Self {
            action: action.to_string(),
            message,
        }
    }
}

fn string_arg(args: &[Value], index: usize) -> Result<String, BridgeError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(BridgeError::InvalidArguments(format!(
            "argument {} must be a string, got {}",
            index,
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "command_test.rs"]
mod tests;
