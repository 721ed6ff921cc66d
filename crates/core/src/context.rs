//! Context trait: the conversation history an invocation reads and appends to.
//!
//! A context is append-only while the runner is working on it. Every pushed
//! message is validated first; a batch is either stored completely or not at
//! all.

use async_trait::async_trait;

use crate::error::ContextError;
use crate::message::Message;

#[async_trait]
pub trait Context: Send + Sync {
    /// Append messages, in order.
    async fn push(&self, messages: Vec<Message>) -> std::result::Result<(), ContextError>;

    /// Snapshot of the full history.
    async fn messages(&self) -> std::result::Result<Vec<Message>, ContextError>;

    /// The most recent message, if any.
    async fn last(&self) -> std::result::Result<Option<Message>, ContextError> {
        Ok(self.messages().await?.pop())
    }
}

/// Validate every message of a batch before any of them is stored.
pub fn validate_batch(messages: &[Message]) -> std::result::Result<(), ContextError> {
    for message in messages {
        message.validate()?;
    }
    Ok(())
}
