//! In-memory context, the reference conversation store.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use toolweave_core::context::{validate_batch, Context};
use toolweave_core::error::ContextError;
use toolweave_core::message::{Message, Role};

/// A context that keeps the conversation in a Vec.
///
/// Clones share the same history.
#[derive(Clone, Default)]
pub struct InMemoryContext {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl InMemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the conversation with a bootstrap system message.
    pub fn with_system(message: Message) -> Self {
        Self {
            messages: Arc::new(RwLock::new(vec![message])),
        }
    }

    /// Replace (or insert) the system message at position 0.
    ///
    /// Only meant for setup before the context is handed to a runner.
    pub async fn set_system(&self, message: Message) {
        let mut messages = self.messages.write().await;
        match messages.first_mut() {
            Some(first) if first.role == Role::System => *first = message,
            _ => messages.insert(0, message),
        }
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl Context for InMemoryContext {
    async fn push(&self, batch: Vec<Message>) -> Result<(), ContextError> {
        validate_batch(&batch)?;
        let mut messages = self.messages.write().await;
        tracing::trace!(count = batch.len(), total = messages.len() + batch.len(), "Context push");
        messages.extend(batch);
        Ok(())
    }

    async fn messages(&self) -> Result<Vec<Message>, ContextError> {
        Ok(self.messages.read().await.clone())
    }

    async fn last(&self) -> Result<Option<Message>, ContextError> {
        Ok(self.messages.read().await.last().cloned())
    }
}
