//! Codec trait: converts between structured messages and a model family's
//! prompt text.
//!
//! Encoding is deterministic: the same history always produces the same
//! bytes for a given codec instance. [`Codec::decode`] reads a complete
//! response; [`Codec::decode_prefix`] reads a growing prefix of one and holds
//! back marker bytes that are still arriving. Either reports a buffer that
//! cannot be read yet as [`DecodeError::Partial`].

use crate::error::{DecodeError, EncodeError};
use crate::message::Message;

pub trait Codec: Send + Sync {
    /// Dialect name (e.g., "qwen3").
    fn name(&self) -> &str;

    /// Render a full conversation as a prompt, including the generation
    /// suffix when the model is expected to speak next.
    fn encode(&self, messages: &[Message]) -> std::result::Result<Vec<u8>, EncodeError>;

    /// Rebuild one assistant message from raw model output.
    fn decode(&self, raw: &[u8]) -> std::result::Result<Message, DecodeError>;

    /// Decode output that is still streaming in. A trailing fragment of a
    /// special token is left out of the text until it completes.
    fn decode_prefix(&self, raw: &[u8]) -> std::result::Result<Message, DecodeError> {
        self.decode(raw)
    }
}

/// Interpret raw model output as UTF-8.
///
/// A buffer that ends mid-sequence is [`DecodeError::Partial`]; any other
/// invalid byte is [`DecodeError::Malformed`].
pub fn decode_utf8(raw: &[u8]) -> std::result::Result<&str, DecodeError> {
    match std::str::from_utf8(raw) {
        Ok(text) => Ok(text),
        Err(e) if e.error_len().is_none() => Err(DecodeError::Partial(format!(
            "incomplete UTF-8 sequence at byte {}",
            e.valid_up_to()
        ))),
        Err(e) => Err(DecodeError::Malformed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_utf8_passes_through() {
        assert_eq!(decode_utf8("héllo".as_bytes()).unwrap(), "héllo");
    }

    #[test]
    fn truncated_sequence_is_partial() {
        let bytes = "é".as_bytes();
        let err = decode_utf8(&bytes[..1]).unwrap_err();
        assert!(err.is_partial());
    }

    #[test]
    fn invalid_byte_is_malformed() {
        let err = decode_utf8(&[b'a', 0xff, b'b']).unwrap_err();
        assert!(!err.is_partial());
    }
}
