//! Message and content domain types.
//!
//! These are the value objects that flow through the whole loop:
//! the caller builds a user message → a codec encodes the history → the
//! decoder rebuilds an assistant message → tool results come back as tool
//! messages.
//!
//! The JSON shape is the interchange format used at the outer boundary:
//! every content item is an object with exactly one key
//! (`text`, `blob`, `tools`, `tool-input`, `tool-output`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and tool announcements
    System,
    /// The end user
    User,
    /// The model
    Assistant,
    /// Tool execution result
    Tool,
    /// Any role string we do not understand. Codecs refuse to encode it.
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool announced to the model: name, description and a JSON Schema
/// describing its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSchema {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// JSON Schema for the parameters (`null` when the tool takes none)
    #[serde(default)]
    pub input_schema: serde_json::Value,
}

impl ToolSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A model-requested tool invocation.
///
/// Arguments are ordered `(key, value)` string pairs. Values that were JSON
/// objects, arrays or numbers in the model output are carried as their JSON
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub arguments: Vec<(String, String)>,
}

impl ToolInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.push((key.into(), value.into()));
        self
    }

    /// Look up an argument value by key.
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Content type stamped on tool outputs produced by the registry.
pub const TOOL_OUTPUT_CONTENT_TYPE: &str = "tool-output";

/// The result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    #[serde(default)]
    pub id: String,

    pub name: String,

    #[serde(default = "default_content_type")]
    pub content_type: String,

    #[serde(default)]
    pub content: Vec<OutputContent>,
}

fn default_content_type() -> String {
    TOOL_OUTPUT_CONTENT_TYPE.into()
}

impl ToolOutput {
    pub fn new(name: impl Into<String>, content: Vec<OutputContent>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            content_type: default_content_type(),
            content,
        }
    }

    /// A tool output holding a single text item.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, vec![OutputContent::Text { text: text.into() }])
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// One item inside a tool output.
///
/// Binary payloads (`data`, `blob`) are base64 text, as tools usually
/// receive them that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutputContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(default, rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(default, rename = "mimeType")]
        mime_type: String,
    },
    ResourceLink {
        uri: String,
        #[serde(default)]
        name: String,
    },
    Resource {
        resource: ResourceContents,
    },
}

/// Embedded resource contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceContents {
    Text { uri: String, text: String },
    Blob { uri: String, blob: String },
}

/// A single content item of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Content {
    Text(String),

    Blob(#[serde(with = "base64_bytes")] Vec<u8>),

    /// Tools announced to the model (normally inside the system message)
    #[serde(rename = "tools")]
    ToolCatalog(Vec<ToolSchema>),

    ToolInput(ToolInput),

    ToolOutput(ToolOutput),
}

impl Content {
    /// The interchange tag of this variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Blob(_) => "blob",
            Content::ToolCatalog(_) => "tools",
            Content::ToolInput(_) => "tool-input",
            Content::ToolOutput(_) => "tool-output",
        }
    }
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    pub content: Vec<Content>,

    /// Marks the last logical chunk of a response that was delivered as
    /// several messages.
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

impl Message {
    pub fn new(role: Role, content: Vec<Content>) -> Self {
        Self {
            role,
            content,
            is_final: false,
        }
    }

    /// Create a system message holding instructions.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![Content::Text(text.into())])
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Content::Text(text.into())])
    }

    /// Create an assistant text message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![Content::Text(text.into())])
    }

    /// Create an assistant message requesting a tool call.
    pub fn tool_call(input: ToolInput) -> Self {
        Self::new(Role::Assistant, vec![Content::ToolInput(input)])
    }

    /// Wrap a tool result as a tool message.
    pub fn tool_output(output: ToolOutput) -> Self {
        Self::new(Role::Tool, vec![Content::ToolOutput(output)])
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content.push(content);
        self
    }

    pub fn finalized(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// First text item, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|c| match c {
            Content::Text(t) => Some(t.as_str()),
            _ => None,
        })
    }

    /// All text items joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                Content::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_inputs(&self) -> impl Iterator<Item = &ToolInput> {
        self.content.iter().filter_map(|c| match c {
            Content::ToolInput(input) => Some(input),
            _ => None,
        })
    }

    pub fn has_tool_input(&self) -> bool {
        self.tool_inputs().next().is_some()
    }

    /// The announced tool catalog, if this message carries one.
    pub fn tool_catalog(&self) -> Option<&[ToolSchema]> {
        self.content.iter().find_map(|c| match c {
            Content::ToolCatalog(tools) => Some(tools.as_slice()),
            _ => None,
        })
    }

    /// Check the structural invariants a message must hold before it can be
    /// pushed onto a context.
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.content.is_empty() {
            return Err(MessageError::Empty { role: self.role });
        }
        for item in &self.content {
            match item {
                Content::ToolInput(_) if self.role != Role::Assistant => {
                    return Err(MessageError::MisplacedContent {
                        kind: item.kind(),
                        role: self.role,
                    });
                }
                Content::ToolOutput(_) if self.role != Role::Tool => {
                    return Err(MessageError::MisplacedContent {
                        kind: item.kind(),
                        role: self.role,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// A structural invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("{role} message has no content")]
    Empty { role: Role },

    #[error("{kind} content is not allowed in a {role} message")]
    MisplacedContent { kind: &'static str, role: Role },
}

/// Blob payloads travel as base64 text in JSON.
mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.first_text(), Some("Hello, agent!"));
        assert!(!msg.is_final);
        assert!(!msg.has_tool_input());
    }

    #[test]
    fn content_uses_single_key_objects() {
        let msg = Message::assistant("hi").with_content(Content::ToolInput(
            ToolInput::new("date").with_id("call_1"),
        ));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"][0], serde_json::json!({ "text": "hi" }));
        assert_eq!(json["content"][1]["tool-input"]["name"], "date");
        assert_eq!(json["final"], false);
    }

    #[test]
    fn tool_catalog_serializes_as_tools() {
        let msg = Message::system("rules").with_content(Content::ToolCatalog(vec![
            ToolSchema::new("date", "current date", serde_json::Value::Null),
        ]));
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#"{"tools":[{"name":"date""#));
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tool_catalog().map(|t| t.len()), Some(1));
    }

    #[test]
    fn blob_is_base64_text() {
        let content = Content::Blob(vec![0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_string(&content).unwrap();
        assert_eq!(json, r#"{"blob":"3q2+7w=="}"#);
        let back: Content = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn tool_arguments_are_ordered_pairs() {
        let json = r#"{"tool-input":{"id":"c1","name":"weather","arguments":[["city","Oslo"],["unit","c"]]}}"#;
        let content: Content = serde_json::from_str(json).unwrap();
        match content {
            Content::ToolInput(input) => {
                assert_eq!(input.argument("city"), Some("Oslo"));
                assert_eq!(input.arguments[1].0, "unit");
            }
            other => panic!("Wrong variant: {other:?}"),
        }
    }

    #[test]
    fn tool_output_items_are_type_tagged() {
        let output = ToolOutput::new(
            "fetch",
            vec![
                OutputContent::Text { text: "ok".into() },
                OutputContent::Resource {
                    resource: ResourceContents::Text {
                        uri: "file:///a".into(),
                        text: "body".into(),
                    },
                },
            ],
        );
        let json = serde_json::to_value(Content::ToolOutput(output.clone())).unwrap();
        assert_eq!(json["tool-output"]["contentType"], "tool-output");
        assert_eq!(json["tool-output"]["content"][0]["type"], "text");
        assert_eq!(json["tool-output"]["content"][1]["resource"]["uri"], "file:///a");
        let back: Content = serde_json::from_value(json).unwrap();
        assert_eq!(back, Content::ToolOutput(output));
    }

    #[test]
    fn unknown_role_deserializes_to_unknown() {
        let msg: Message =
            serde_json::from_str(r#"{"role":"narrator","content":[{"text":"x"}]}"#).unwrap();
        assert_eq!(msg.role, Role::Unknown);
        assert!(!msg.is_final);
    }

    #[test]
    fn more_than_one_key_is_rejected() {
        let result: Result<Content, _> = serde_json::from_str(r#"{"text":"a","blob":"AA=="}"#);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_empty_content() {
        let msg = Message::new(Role::User, vec![]);
        assert_eq!(msg.validate(), Err(MessageError::Empty { role: Role::User }));
    }

    #[test]
    fn validate_rejects_misplaced_tool_content() {
        let msg = Message::new(
            Role::User,
            vec![Content::ToolInput(ToolInput::new("date"))],
        );
        assert!(matches!(
            msg.validate(),
            Err(MessageError::MisplacedContent { kind: "tool-input", .. })
        ));

        let msg = Message::new(
            Role::Assistant,
            vec![Content::ToolOutput(ToolOutput::text("date", "today"))],
        );
        assert!(msg.validate().is_err());

        assert!(Message::tool_output(ToolOutput::text("date", "today")).validate().is_ok());
    }

    #[test]
    fn text_joins_items() {
        let msg = Message::assistant("thinking").with_content(Content::Text("answer".into()));
        assert_eq!(msg.text(), "thinking\nanswer");
    }
}
