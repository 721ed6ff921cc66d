//! `toolweave decode`: raw model output in, message JSON out.

use std::path::PathBuf;

use toolweave_codecs::Dialect;
use toolweave_core::Codec;

pub fn run(dialect: Option<Dialect>, file: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let codec = super::codec_for(dialect)?;
    let input = super::read_input(file.as_deref())?;
    println!("{}", decode(&input, codec.as_ref())?);
    Ok(())
}

/// Decode a complete model output into pretty-printed message JSON.
pub fn decode(input: &[u8], codec: &dyn Codec) -> Result<String, Box<dyn std::error::Error>> {
    let message = codec.decode(input)?;
    tracing::debug!(dialect = codec.name(), items = message.content.len(), "Decoded");
    Ok(serde_json::to_string_pretty(&message)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolweave_codecs::QwenCodec;
    use toolweave_core::Message;

    #[test]
    fn decodes_tool_call_to_json() {
        let raw = b"<tool_call>\n{\"name\": \"datetime\", \"arguments\": {\"timezone\": \"utc\"}}\n</tool_call><|im_end|>";
        let json = decode(raw, &QwenCodec::qwen2_5()).unwrap();

        let message: Message = serde_json::from_str(&json).unwrap();
        let call = message.tool_inputs().next().unwrap();
        assert_eq!(call.name, "datetime");
        assert_eq!(call.argument("timezone"), Some("utc"));
    }

    #[test]
    fn incomplete_output_is_an_error() {
        let raw = b"<tool_call>\n{\"name\": \"datetime\"";
        assert!(decode(raw, &QwenCodec::qwen2_5()).is_err());
    }
}
