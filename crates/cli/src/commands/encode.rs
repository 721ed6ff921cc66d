//! `toolweave encode`: JSON messages in, dialect prompt out.

use std::io::Write;
use std::path::PathBuf;

use toolweave_codecs::Dialect;
use toolweave_core::{Codec, Message};

pub fn run(dialect: Option<Dialect>, file: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let codec = super::codec_for(dialect)?;
    let input = super::read_input(file.as_deref())?;
    let prompt = encode(&input, codec.as_ref())?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&prompt)?;
    stdout.flush()?;
    Ok(())
}

/// Parse a JSON message array and encode it.
pub fn encode(input: &[u8], codec: &dyn Codec) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let messages: Vec<Message> =
        serde_json::from_slice(input).map_err(|e| format!("Invalid message JSON: {e}"))?;
    tracing::debug!(messages = messages.len(), dialect = codec.name(), "Encoding");
    Ok(codec.encode(&messages)?)
}
