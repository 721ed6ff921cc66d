//! Incremental decoding of a growing model output buffer.

use toolweave_core::{Codec, Content, Message};

/// Re-decodes the buffered output after every chunk and yields only what
/// has not been emitted yet.
///
/// Text is tracked per channel: the final channel, and everything else
/// (analysis, or plain output from dialects without channels). A tool-call
/// message is emitted whole, once.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    accumulated: Vec<u8>,
    last_final_len: usize,
    last_analysis_len: usize,
    has_tool_call: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return the deltas it produced.
    ///
    /// A buffer that does not decode yet (partial marker, cut UTF-8) or
    /// fails to decode yields nothing; the next chunk tries again.
    pub fn push(&mut self, chunk: &[u8], codec: &dyn Codec) -> Vec<Message> {
        self.accumulated.extend_from_slice(chunk);

        match codec.decode_prefix(&self.accumulated) {
            Ok(decoded) => self.emit(decoded),
            Err(e) => {
                tracing::trace!(error = %e, buffered = self.accumulated.len(), "No delta yet");
                Vec::new()
            }
        }
    }

    /// Decode the complete buffer once the stream has ended and return
    /// whatever the prefix decodes held back.
    pub fn finish(&mut self, codec: &dyn Codec) -> Vec<Message> {
        match codec.decode(&self.accumulated) {
            Ok(decoded) => self.emit(decoded),
            Err(e) => {
                tracing::trace!(error = %e, buffered = self.accumulated.len(), "Nothing left to flush");
                Vec::new()
            }
        }
    }

    fn emit(&mut self, decoded: Message) -> Vec<Message> {
        if decoded.has_tool_input() {
            if self.has_tool_call {
                return Vec::new();
            }
            self.has_tool_call = true;
            return vec![decoded];
        }
        if self.has_tool_call {
            return Vec::new();
        }

        let texts: Vec<&str> = decoded
            .content
            .iter()
            .filter_map(|c| match c {
                Content::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();

        let joined;
        let (analysis, final_text): (Option<&str>, Option<&str>) =
            match (decoded.is_final, texts.as_slice()) {
                (true, [analysis, .., last]) => (Some(*analysis), Some(*last)),
                (true, [only]) => (None, Some(*only)),
                (false, [_, ..]) => {
                    joined = texts.join("\n");
                    (Some(joined.as_str()), None)
                }
                _ => (None, None),
            };

        let mut deltas = Vec::new();
        if let Some(text) = analysis
            && let Some(tail) = delta(text, &mut self.last_analysis_len)
        {
            deltas.push(Message::assistant(tail));
        }
        if let Some(text) = final_text
            && let Some(tail) = delta(text, &mut self.last_final_len)
        {
            deltas.push(Message::assistant(tail));
        }
        deltas
    }

    /// Everything received so far.
    pub fn buffer(&self) -> &[u8] {
        &self.accumulated
    }

    pub fn has_tool_call(&self) -> bool {
        self.has_tool_call
    }
}

/// The part of `current` past `emitted`, advancing `emitted` when there is one.
fn delta(current: &str, emitted: &mut usize) -> Option<String> {
    if current.len() <= *emitted {
        return None;
    }
    let tail = current.get(*emitted..)?;
    *emitted = current.len();
    Some(tail.to_string())
}
