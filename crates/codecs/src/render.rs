//! Rendering helpers shared by the dialects: system-message scan, tool
//! schema validation, the TypeScript-style `functions` namespace, tool
//! output flattening and reasoning-span removal.

use serde_json::Value;
use toolweave_core::{
    Content, EncodeError, Message, OutputContent, ResourceContents, Role, ToolOutput, ToolSchema,
};

use crate::args::value_to_string;

pub(crate) const THINK_START: &str = "<think>";
pub(crate) const THINK_END: &str = "</think>";

/// What the first system message announces.
pub(crate) struct Preamble<'a> {
    /// Position of the system message in the history
    pub index: Option<usize>,
    pub instructions: String,
    pub tools: &'a [ToolSchema],
}

impl Preamble<'_> {
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// Single pass over the history: finds the system message and rejects
/// roles no dialect can express.
pub(crate) fn preamble(messages: &[Message]) -> Result<Preamble<'_>, EncodeError> {
    let mut preamble = Preamble {
        index: None,
        instructions: String::new(),
        tools: &[],
    };
    for (i, message) in messages.iter().enumerate() {
        match message.role {
            Role::Unknown => return Err(EncodeError::UnsupportedRole(message.role.to_string())),
            Role::System if preamble.index.is_none() => {
                preamble.index = Some(i);
                preamble.instructions = message.text();
                preamble.tools = message.tool_catalog().unwrap_or(&[]);
            }
            _ => {}
        }
    }
    Ok(preamble)
}

/// The parameter properties of a tool, in declaration order.
pub(crate) struct Parameters<'a> {
    pub properties: Vec<(&'a str, &'a Value)>,
    required: Vec<&'a str>,
}

impl Parameters<'_> {
    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(&name)
    }
}

pub(crate) fn parameters(tool: &ToolSchema) -> Result<Parameters<'_>, EncodeError> {
    let malformed = |reason: &str| EncodeError::MalformedToolSchema {
        tool: tool.name.clone(),
        reason: reason.to_string(),
    };

    if tool.name.trim().is_empty() {
        return Err(malformed("tool name is empty"));
    }

    let schema = match &tool.input_schema {
        Value::Null => {
            return Ok(Parameters {
                properties: Vec::new(),
                required: Vec::new(),
            });
        }
        Value::Object(schema) => schema,
        _ => return Err(malformed("input schema is not an object")),
    };

    let properties = match schema.get("properties") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(props)) => props.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        Some(_) => return Err(malformed("'properties' is not an object")),
    };

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    Ok(Parameters {
        properties,
        required,
    })
}

/// TypeScript type for a JSON Schema property.
fn ts_type(schema: &Value) -> String {
    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        return values
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(" | ");
    }
    match schema.get("type").and_then(Value::as_str) {
        Some("string") => "string".into(),
        Some("integer") | Some("number") => "number".into(),
        Some("boolean") => "boolean".into(),
        Some("object") => "object".into(),
        Some("array") => match schema.get("items") {
            Some(items) => {
                let inner = ts_type(items);
                if inner.contains(' ') {
                    format!("({inner})[]")
                } else {
                    format!("{inner}[]")
                }
            }
            None => "any[]".into(),
        },
        _ => "any".into(),
    }
}

/// Render tools as the `namespace functions { ... }` block understood by
/// Harmony-style and Llama templates.
pub(crate) fn typescript_namespace(tools: &[ToolSchema]) -> Result<String, EncodeError> {
    let mut out = String::from("namespace functions {\n\n");
    for tool in tools {
        let params = parameters(tool)?;
        if !tool.description.is_empty() {
            out.push_str(&format!("// {}\n", tool.description));
        }
        if params.properties.is_empty() {
            out.push_str(&format!("type {} = () => any;\n\n", tool.name));
            continue;
        }

        out.push_str(&format!("type {} = (_: {{\n", tool.name));
        for (name, prop) in &params.properties {
            if let Some(description) = prop.get("description").and_then(Value::as_str) {
                out.push_str(&format!("// {description}\n"));
            }
            let optional = if params.is_required(name) { "" } else { "?" };
            out.push_str(&format!("{name}{optional}: {},", ts_type(prop)));
            if let Some(default) = prop.get("default") {
                out.push_str(&format!(" // default: {}", value_to_string(default)));
            }
            out.push('\n');
        }
        out.push_str("}) => any;\n\n");
    }
    out.push_str("} // namespace functions");
    Ok(out)
}

fn output_item_text(item: &OutputContent) -> String {
    match item {
        OutputContent::Text { text } => text.clone(),
        OutputContent::Image { data, .. } => format!("Image Data: {data}"),
        OutputContent::Audio { data, .. } => format!("Audio Data: {data}"),
        OutputContent::ResourceLink { uri, .. } => format!("Resource Link: {uri}"),
        OutputContent::Resource { resource } => match resource {
            ResourceContents::Text { text, .. } => format!("Resource Content (Text): {text}"),
            ResourceContents::Blob { blob, .. } => format!("Resource Content (Blob): {blob}"),
        },
    }
}

/// Flatten one tool output to text, one line per item.
pub(crate) fn tool_output_text(output: &ToolOutput) -> String {
    output
        .content
        .iter()
        .map(output_item_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flatten every result carried by a tool message.
pub(crate) fn tool_message_text(message: &Message) -> String {
    message
        .content
        .iter()
        .filter_map(|c| match c {
            Content::Text(text) => Some(text.clone()),
            Content::ToolOutput(output) => Some(tool_output_text(output)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove `<think>…</think>` spans. An unterminated `<think>` hides
/// everything after it; a `</think>` with no opener hides everything
/// before it.
pub(crate) fn strip_think(text: &str) -> String {
    let mut rest = text;
    if let Some(end) = rest.find(THINK_END) {
        if !rest[..end].contains(THINK_START) {
            rest = &rest[end + THINK_END.len()..];
        }
    }

    let mut out = String::with_capacity(rest.len());
    loop {
        let Some(start) = rest.find(THINK_START) else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..start]);
        let after = &rest[start + THINK_START.len()..];
        match after.find(THINK_END) {
            Some(end) => rest = &after[end + THINK_END.len()..],
            None => break,
        }
    }
    out
}

/// Drop a marker that is still arriving at the end of a streamed buffer:
/// an unclosed `<|…` special token, or the first bytes of `<|` or one of
/// `markers` (a lone trailing `<` included).
pub(crate) fn trim_partial_marker<'a>(text: &'a str, markers: &[&str]) -> &'a str {
    if let Some(open) = text.rfind("<|")
        && !text[open..].contains("|>")
    {
        return &text[..open];
    }
    for marker in std::iter::once(&"<|").chain(markers) {
        for k in (1..marker.len()).rev() {
            if text.ends_with(&marker[..k]) {
                return &text[..text.len() - k];
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_tool() -> ToolSchema {
        ToolSchema::new(
            "get_weather",
            "Get the current weather",
            json!({
                "type": "object",
                "properties": {
                    "location": { "type": "string", "description": "City name" },
                    "unit": { "type": "string", "enum": ["c", "f"], "default": "c" },
                    "days": { "type": "array", "items": { "type": "integer" } }
                },
                "required": ["location"]
            }),
        )
    }

    #[test]
    fn namespace_renders_typed_parameters() {
        let rendered = typescript_namespace(&[weather_tool()]).unwrap();
        let expected = "namespace functions {\n\n\
// Get the current weather\n\
type get_weather = (_: {\n\
// City name\n\
location: string,\n\
unit?: \"c\" | \"f\", // default: c\n\
days?: number[],\n\
}) => any;\n\n\
} // namespace functions";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn namespace_renders_parameterless_tool() {
        let tool = ToolSchema::new("datetime", "", Value::Null);
        let rendered = typescript_namespace(&[tool]).unwrap();
        assert!(rendered.contains("type datetime = () => any;"));
        assert!(!rendered.contains("// \n"));
    }

    #[test]
    fn malformed_schemas_are_rejected() {
        let nameless = ToolSchema::new("", "x", Value::Null);
        assert!(matches!(
            parameters(&nameless),
            Err(EncodeError::MalformedToolSchema { .. })
        ));

        let scalar = ToolSchema::new("x", "", json!("string"));
        assert!(parameters(&scalar).is_err());

        let bad_props = ToolSchema::new("x", "", json!({ "properties": [1] }));
        assert!(parameters(&bad_props).is_err());
    }

    #[test]
    fn preamble_finds_first_system_message() {
        let messages = vec![
            Message::system("Be brief.")
                .with_content(Content::ToolCatalog(vec![weather_tool()])),
            Message::user("hi"),
        ];
        let found = preamble(&messages).unwrap();
        assert_eq!(found.index, Some(0));
        assert_eq!(found.instructions, "Be brief.");
        assert!(found.has_tools());
    }

    #[test]
    fn preamble_rejects_unknown_role() {
        let messages = vec![Message::new(Role::Unknown, vec![Content::Text("?".into())])];
        assert!(matches!(
            preamble(&messages),
            Err(EncodeError::UnsupportedRole(_))
        ));
    }

    #[test]
    fn tool_output_flattens_with_markers() {
        let output = ToolOutput::new(
            "fetch",
            vec![
                OutputContent::Text { text: "ok".into() },
                OutputContent::Image { data: "aW1n".into(), mime_type: "image/png".into() },
                OutputContent::ResourceLink { uri: "https://x.dev".into(), name: "x".into() },
                OutputContent::Resource {
                    resource: ResourceContents::Blob { uri: "file:///b".into(), blob: "AAE=".into() },
                },
            ],
        );
        assert_eq!(
            tool_output_text(&output),
            "ok\nImage Data: aW1n\nResource Link: https://x.dev\nResource Content (Blob): AAE="
        );
    }

    #[test]
    fn think_spans_are_removed() {
        assert_eq!(strip_think("<think>hmm</think>Answer"), "Answer");
        assert_eq!(strip_think("A<think>x</think>B<think>y</think>C"), "ABC");
        assert_eq!(strip_think("Visible<think>still thinking"), "Visible");
        assert_eq!(strip_think("reasoning</think>\n\nAnswer"), "\n\nAnswer");
        assert_eq!(strip_think("plain"), "plain");
    }

    #[test]
    fn partial_markers_are_trimmed() {
        assert_eq!(trim_partial_marker("Hello<|eo", &[]), "Hello");
        assert_eq!(trim_partial_marker("Hello<|eot_id|>", &[]), "Hello<|eot_id|>");
        assert_eq!(trim_partial_marker("Sure <tool_c", &["<tool_call>"]), "Sure ");
        assert_eq!(trim_partial_marker("a < b", &["<tool_call>"]), "a < b");
    }

    #[test]
    fn trailing_angle_bracket_is_held_back() {
        assert_eq!(trim_partial_marker("Hi<", &[]), "Hi");
        assert_eq!(trim_partial_marker("Sure <", &["<tool_call>"]), "Sure ");
        assert_eq!(trim_partial_marker("x <t", &["<tool_call>"]), "x ");
    }
}
