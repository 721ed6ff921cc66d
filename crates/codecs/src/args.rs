//! Tool-call argument conversion shared by every dialect.
//!
//! Models emit arguments as a JSON object; the message model carries them as
//! ordered `(key, value)` string pairs. Decoding normalises each value to a
//! string, encoding opportunistically parses each value back to JSON so that
//! numbers and nested objects do not turn into quoted strings.

use serde_json::{Map, Value};
use toolweave_core::{DecodeError, EncodeError, ToolInput};

/// Convert a JSON value to its argument string form.
///
/// Strings are kept as-is, `null` becomes empty, everything else is
/// re-serialised JSON text.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Turn the `arguments` member of a decoded tool call into ordered pairs.
///
/// Some models send the object as a JSON-encoded string; that form is
/// accepted as well.
pub(crate) fn normalise_arguments(
    tool: &str,
    arguments: Option<&Value>,
) -> Result<Vec<(String, String)>, DecodeError> {
    match arguments {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), value_to_string(v)))
            .collect()),
        Some(Value::String(encoded)) if encoded.trim().is_empty() => Ok(Vec::new()),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(encoded) {
            Ok(Value::Object(map)) => normalise_arguments(tool, Some(&Value::Object(map))),
            _ => Err(DecodeError::Malformed(format!(
                "arguments for '{tool}' are not a JSON object"
            ))),
        },
        Some(_) => Err(DecodeError::Malformed(format!(
            "arguments for '{tool}' are not a JSON object"
        ))),
    }
}

/// Parse a complete JSON object out of a matched tool-call block.
pub(crate) fn parse_object(block: &str) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_str::<Value>(block) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DecodeError::Malformed(
            "tool call is not a JSON object".into(),
        )),
        Err(e) => Err(DecodeError::Malformed(format!(
            "failed to parse tool call JSON: {e}"
        ))),
    }
}

/// Like [`parse_object`], but a body cut off mid-JSON is `Partial`.
pub(crate) fn parse_object_streaming(block: &str) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_str::<Value>(block) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DecodeError::Malformed(
            "tool call is not a JSON object".into(),
        )),
        Err(e) if e.is_eof() => Err(DecodeError::Partial(
            "tool call arguments still streaming".into(),
        )),
        Err(e) => Err(DecodeError::Malformed(format!(
            "failed to parse tool call JSON: {e}"
        ))),
    }
}

/// Rebuild the JSON arguments object of a tool call.
pub(crate) fn arguments_object(input: &ToolInput) -> Map<String, Value> {
    input
        .arguments
        .iter()
        .map(|(k, v)| {
            let value =
                serde_json::from_str::<Value>(v).unwrap_or_else(|_| Value::String(v.clone()));
            (k.clone(), value)
        })
        .collect()
}

/// Serialise the arguments object of a tool call as compact JSON.
pub(crate) fn arguments_json(input: &ToolInput) -> Result<String, EncodeError> {
    serde_json::to_string(&Value::Object(arguments_object(input))).map_err(|e| {
        EncodeError::Arguments {
            tool: input.name.clone(),
            reason: e.to_string(),
        }
    })
}
