//! Error types for the Toolweave domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator (codec, inference, tools, context) has its own error
//! enum; the top-level [`Error`] wraps them all.

use thiserror::Error;

use crate::message::MessageError;

/// The top-level error type for all Toolweave operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Codec errors ---
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    // --- Inference errors ---
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Context errors ---
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    // --- Loop ---
    #[error("Max turns reached ({max_turns})")]
    TurnLimitExceeded { max_turns: usize },
}

impl Error {
    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Encode(_) => "encode",
            Error::Decode(_) => "decode",
            Error::Inference(_) => "inference",
            Error::Tool(_) => "tool",
            Error::Context(_) => "context",
            Error::TurnLimitExceeded { .. } => "turn_limit",
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("Unsupported role: {0}")]
    UnsupportedRole(String),

    #[error("Malformed tool schema for '{tool}': {reason}")]
    MalformedToolSchema { tool: String, reason: String },

    #[error("Cannot serialize tool arguments for '{tool}': {reason}")]
    Arguments { tool: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// More bytes are needed before the buffer can be decoded.
    #[error("Incomplete output: {0}")]
    Partial(String),

    #[error("Malformed output: {0}")]
    Malformed(String),
}

impl DecodeError {
    pub fn is_partial(&self) -> bool {
        matches!(self, DecodeError::Partial(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("Inference request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] MessageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn inference_error_displays_correctly() {
        let err = Error::Inference(InferenceError::ApiError {
            status_code: 503,
            message: "loading model".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("loading model"));
        assert_eq!(err.kind(), "inference");
    }

    #[test]
    fn turn_limit_displays_budget() {
        let err = Error::TurnLimitExceeded { max_turns: 10 };
        assert_eq!(err.to_string(), "Max turns reached (10)");
        assert_eq!(err.kind(), "turn_limit");
    }

    #[test]
    fn partial_is_distinguishable() {
        assert!(DecodeError::Partial("open tool call".into()).is_partial());
        assert!(!DecodeError::Malformed("bad json".into()).is_partial());
    }

    #[test]
    fn message_error_converts_through_context() {
        let err: Error = ContextError::from(MessageError::Empty { role: Role::User }).into();
        assert_eq!(err.kind(), "context");
        assert!(err.to_string().contains("user message has no content"));
    }
}
