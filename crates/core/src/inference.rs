//! Inference engine traits: the abstraction over whatever produces tokens.
//!
//! An engine takes an already-encoded prompt and returns a byte stream of the
//! model's raw output. The engine knows nothing about messages or dialects;
//! the codec sits on both sides of it.
//!
//! Implementations: `CompletionServerEngine` (toolweave-providers), scripted
//! engines in tests.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::InferenceError;

/// A source of raw model output bytes.
#[async_trait]
pub trait TokenStream: Send {
    /// Read up to `max` bytes. `Ok(None)` signals end of stream.
    ///
    /// Chunk boundaries are arbitrary: a read may end in the middle of a
    /// UTF-8 sequence or a control token.
    async fn read(&mut self, max: usize) -> std::result::Result<Option<Vec<u8>>, InferenceError>;
}

/// The core inference trait.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// A human-readable name for this engine (e.g., "completion-server").
    fn name(&self) -> &str;

    /// Start generating from `prompt`.
    async fn compute(
        &self,
        prompt: &[u8],
    ) -> std::result::Result<Box<dyn TokenStream>, InferenceError>;
}

/// A [`TokenStream`] fed by a tokio channel of byte chunks.
///
/// Producers (usually a spawned task reading an HTTP body) push whole chunks;
/// `read` hands them out in pieces no larger than `max`.
pub struct ChannelTokenStream {
    rx: mpsc::Receiver<std::result::Result<Vec<u8>, InferenceError>>,
    pending: Vec<u8>,
}

impl ChannelTokenStream {
    pub fn new(rx: mpsc::Receiver<std::result::Result<Vec<u8>, InferenceError>>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
        }
    }

    /// A stream that yields `bytes` and then ends.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let bytes = bytes.into();
        if !bytes.is_empty() {
            // Capacity is 1 and the channel is fresh, so this cannot fail.
            let _ = tx.try_send(Ok(bytes));
        }
        Self::new(rx)
    }
}

#[async_trait]
impl TokenStream for ChannelTokenStream {
    async fn read(&mut self, max: usize) -> std::result::Result<Option<Vec<u8>>, InferenceError> {
        let max = max.max(1);
        while self.pending.is_empty() {
            match self.rx.recv().await {
                Some(Ok(chunk)) => self.pending = chunk,
                Some(Err(e)) => return Err(e),
                None => return Ok(None),
            }
        }

        if self.pending.len() <= max {
            return Ok(Some(std::mem::take(&mut self.pending)));
        }
        let rest = self.pending.split_off(max);
        Ok(Some(std::mem::replace(&mut self.pending, rest)))
    }
}
