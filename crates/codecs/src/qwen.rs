//! Qwen 2.5 / Qwen 3 ChatML prompt format.
//!
//! Messages are framed as `<|im_start|>ROLE\n…<|im_end|>\n`. Tools are
//! announced as one JSON object per line inside `<tools></tools>`, calls come
//! back as `<tool_call>{"name": …, "arguments": {…}}</tool_call>` and results
//! go to the model as `<tool_response>` blocks inside a user turn.
//!
//! Qwen 3 adds reasoning spans: assistant turns after the last user query
//! carry an empty `<think>` block, and `<think>…</think>` is removed from
//! generated output.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde_json::{json, Value};
use toolweave_core::{decode_utf8, Codec, Content, DecodeError, EncodeError, Message, Role, ToolInput, ToolSchema};

use crate::args;
use crate::render::{self, THINK_END, THINK_START};

const IM_START: &str = "<|im_start|>";
const IM_END: &str = "<|im_end|>";
const ASSISTANT_START: &str = "<|im_start|>assistant";
const END_OF_TEXT: &str = "<|endoftext|>";
const TOOL_CALL_OPEN: &str = "<tool_call>";
const TOOL_CALL_CLOSE: &str = "</tool_call>";
const TOOL_RESPONSE_OPEN: &str = "<tool_response>";
const TOOL_RESPONSE_CLOSE: &str = "</tool_response>";

const DEFAULT_SYSTEM: &str = "You are Qwen, created by Alibaba Cloud. You are a helpful assistant.";

const TOOLS_HEADER: &str = "# Tools\n\nYou may call one or more functions to assist with the user query.\n\n\
You are provided with function signatures within <tools></tools> XML tags:\n<tools>";
const TOOLS_FOOTER: &str = "\n</tools>\n\nFor each function call, return a json object with function name \
and arguments within <tool_call></tool_call> XML tags:\n<tool_call>\n\
{\"name\": <function-name>, \"arguments\": <args-json-object>}\n</tool_call>";

static TOOL_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<tool_call>\s*(\{.*?\})\s*</tool_call>").unwrap()
});

/// Which generation of the Qwen template to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QwenVersion {
    V2_5,
    V3,
}

/// Codec for Qwen 2.5 and Qwen 3 instruct models.
#[derive(Debug, Clone)]
pub struct QwenCodec {
    version: QwenVersion,
}

impl QwenCodec {
    pub fn new(version: QwenVersion) -> Self {
        Self { version }
    }

    pub fn qwen2_5() -> Self {
        Self::new(QwenVersion::V2_5)
    }

    pub fn qwen3() -> Self {
        Self::new(QwenVersion::V3)
    }

    pub fn version(&self) -> QwenVersion {
        self.version
    }

    fn thinks(&self) -> bool {
        self.version == QwenVersion::V3
    }

    fn tools_block(tools: &[ToolSchema]) -> Result<String, EncodeError> {
        let mut out = String::from(TOOLS_HEADER);
        for tool in tools {
            render::parameters(tool)?;
            let parameters = match &tool.input_schema {
                Value::Null => json!({}),
                schema => schema.clone(),
            };
            let signature = json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": parameters,
            });
            out.push('\n');
            out.push_str(&signature.to_string());
        }
        out.push_str(TOOLS_FOOTER);
        Ok(out)
    }

    fn system_segment(&self, instructions: &str, tools: &[ToolSchema]) -> Result<String, EncodeError> {
        let mut out = format!("{IM_START}system\n");
        match self.version {
            QwenVersion::V2_5 => {
                out.push_str(if instructions.is_empty() { DEFAULT_SYSTEM } else { instructions });
                if !tools.is_empty() {
                    out.push_str("\n\n");
                    out.push_str(&Self::tools_block(tools)?);
                }
            }
            QwenVersion::V3 => {
                out.push_str(instructions);
                if !tools.is_empty() {
                    if !instructions.is_empty() {
                        out.push_str("\n\n");
                    }
                    out.push_str(&Self::tools_block(tools)?);
                }
            }
        }
        out.push_str(IM_END);
        out.push('\n');
        Ok(out)
    }

    fn decode_tool_calls(&self, body: &str) -> Result<Message, DecodeError> {
        let opened = body.matches(TOOL_CALL_OPEN).count();
        let mut content = Vec::with_capacity(opened);
        for caps in TOOL_CALL_RE.captures_iter(body) {
            let call = args::parse_object(&caps[1])?;
            let name = call
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| DecodeError::Malformed("tool call missing function name".into()))?;
            let mut input = ToolInput::new(name);
            input.arguments = args::normalise_arguments(name, call.get("arguments"))?;
            content.push(Content::ToolInput(input));
        }
        if content.len() < opened {
            return Err(DecodeError::Partial(format!(
                "{TOOL_CALL_OPEN} opened without a complete {TOOL_CALL_CLOSE} block"
            )));
        }
        Ok(Message::new(Role::Assistant, content))
    }

    fn decode_output(&self, raw: &[u8], streaming: bool) -> Result<Message, DecodeError> {
        let text = decode_utf8(raw)?;
        let text = if self.thinks() {
            render::strip_think(text)
        } else {
            text.to_string()
        };

        let mut body = text.trim();
        body = body.strip_prefix(ASSISTANT_START).unwrap_or(body);
        for end in [IM_END, END_OF_TEXT] {
            body = body.strip_suffix(end).unwrap_or(body).trim_end();
        }
        let body = if streaming {
            render::trim_partial_marker(body, &[TOOL_CALL_OPEN, THINK_START])
        } else {
            body
        };

        if body.contains(TOOL_CALL_OPEN) {
            return self.decode_tool_calls(body);
        }

        Ok(Message::assistant(body.trim()))
    }
}

impl Codec for QwenCodec {
    fn name(&self) -> &str {
        match self.version {
            QwenVersion::V2_5 => "qwen2.5",
            QwenVersion::V3 => "qwen3",
        }
    }

    fn encode(&self, messages: &[Message]) -> Result<Vec<u8>, EncodeError> {
        let preamble = render::preamble(messages)?;
        let last_query = messages.iter().rposition(|m| m.role == Role::User);
        let empty_think = format!("{THINK_START}\n\n{THINK_END}\n\n");

        let mut out = String::new();
        if preamble.index.is_none() && self.version == QwenVersion::V2_5 {
            out.push_str(&self.system_segment("", &[])?);
        }

        for (i, message) in messages.iter().enumerate() {
            match message.role {
                Role::System if preamble.index == Some(i) => {
                    out.push_str(&self.system_segment(&preamble.instructions, preamble.tools)?);
                }
                Role::System | Role::User => {
                    out.push_str(&format!(
                        "{IM_START}{}\n{}{IM_END}\n",
                        message.role,
                        message.text()
                    ));
                }
                Role::Assistant => {
                    out.push_str(&format!("{IM_START}assistant\n"));
                    if self.thinks() && last_query.is_some_and(|q| i > q) {
                        out.push_str(&empty_think);
                    }
                    let mut parts = Vec::with_capacity(message.content.len());
                    for content in &message.content {
                        match content {
                            Content::Text(text) => parts.push(text.clone()),
                            Content::ToolInput(input) => {
                                let call = json!({
                                    "name": input.name,
                                    "arguments": Value::Object(args::arguments_object(input)),
                                });
                                parts.push(format!("{TOOL_CALL_OPEN}\n{call}\n{TOOL_CALL_CLOSE}"));
                            }
                            _ => {}
                        }
                    }
                    out.push_str(&parts.join("\n"));
                    out.push_str(IM_END);
                    out.push('\n');
                }
                Role::Tool => {
                    if i == 0 || messages[i - 1].role != Role::Tool {
                        out.push_str(&format!("{IM_START}user"));
                    }
                    out.push_str(&format!(
                        "\n{TOOL_RESPONSE_OPEN}\n{}\n{TOOL_RESPONSE_CLOSE}",
                        render::tool_message_text(message)
                    ));
                    if messages.get(i + 1).is_none_or(|next| next.role != Role::Tool) {
                        out.push_str(IM_END);
                        out.push('\n');
                    }
                }
                Role::Unknown => {
                    return Err(EncodeError::UnsupportedRole(message.role.to_string()));
                }
            }
        }

        if matches!(messages.last(), Some(last) if last.role != Role::Assistant) {
            out.push_str(&format!("{IM_START}assistant\n"));
            if self.thinks() {
                out.push_str(&empty_think);
            }
        }

        Ok(out.into_bytes())
    }

    fn decode(&self, raw: &[u8]) -> Result<Message, DecodeError> {
        self.decode_output(raw, false)
    }

    fn decode_prefix(&self, raw: &[u8]) -> Result<Message, DecodeError> {
        self.decode_output(raw, true)
    }
}
