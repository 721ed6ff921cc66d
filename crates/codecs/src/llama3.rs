//! Llama 3.1 prompt format with custom (`<function=…>`) tool calling.
//!
//! ```text
//! <|begin_of_text|><|start_header_id|>system<|end_header_id|>
//!
//! Environment: ipython
//! Cutting Knowledge Date: December 2023
//! Today Date: 26 Jul 2024
//!
//! {instructions}{tools}<|eot_id|><|start_header_id|>user<|end_header_id|>
//!
//! {text}<|eot_id|><|start_header_id|>assistant<|end_header_id|>
//!
//! ```
//!
//! Tool results are sent back as the `ipython` role; an assistant turn that
//! calls a tool ends with `<|eom_id|>` instead of `<|eot_id|>`.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex_lite::Regex;
use serde_json::Value;
use toolweave_core::{decode_utf8, Codec, Content, DecodeError, EncodeError, Message, Role, ToolInput};

use crate::args;
use crate::render;

const BEGIN_OF_TEXT: &str = "<|begin_of_text|>";
const START_HEADER: &str = "<|start_header_id|>";
const END_HEADER: &str = "<|end_header_id|>";
const EOT: &str = "<|eot_id|>";
const EOM: &str = "<|eom_id|>";
const END_OF_TEXT: &str = "<|end_of_text|>";
const PYTHON_TAG: &str = "<|python_tag|>";
const FUNCTION_OPEN: &str = "<function=";
const FUNCTION_CLOSE: &str = "</function>";

static FUNCTION_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<function=([^>]+)>\s*(\{.*?\})\s*</function>").unwrap()
});

fn header(role: &str) -> String {
    format!("{START_HEADER}{role}{END_HEADER}\n\n")
}

fn tool_instructions(namespace: &str) -> String {
    format!(
        "You have access to the following functions:\n\n\
{namespace}\n\n\
If you choose to call a function ONLY reply in the following format:\n\
<function=example_function_name>{{\"example_name\": \"example_value\"}}</function>\n\n\
Reminder:\n\
- Function calls MUST follow the specified format\n\
- Required parameters MUST be specified\n\
- Only call one function at a time\n\
- Put the entire function call reply on one line"
    )
}

/// Codec for Llama 3.1 instruct models.
#[derive(Debug, Clone)]
pub struct Llama3Codec {
    current_date: NaiveDate,
}

impl Llama3Codec {
    pub fn new() -> Self {
        Self {
            current_date: Local::now().date_naive(),
        }
    }

    /// Pin the date shown in the system header.
    pub fn with_current_date(mut self, date: NaiveDate) -> Self {
        self.current_date = date;
        self
    }

    fn decode_function_calls(&self, body: &str) -> Result<Message, DecodeError> {
        let opened = body.matches(FUNCTION_OPEN).count();
        let mut content = Vec::with_capacity(opened);
        for caps in FUNCTION_CALL_RE.captures_iter(body) {
            let name = caps[1].trim().to_string();
            let arguments = Value::Object(args::parse_object(&caps[2])?);
            let mut input = ToolInput::new(name);
            input.arguments = args::normalise_arguments(&input.name, Some(&arguments))?;
            content.push(Content::ToolInput(input));
        }
        if content.len() < opened {
            return Err(DecodeError::Partial(format!(
                "{FUNCTION_OPEN} opened without a complete {FUNCTION_CLOSE} block"
            )));
        }
        Ok(Message::new(Role::Assistant, content))
    }

    /// `<|python_tag|>{"name": …, "parameters": {…}}`: the JSON tool-call form.
    fn decode_python_tag(&self, json: &str) -> Result<Message, DecodeError> {
        let call = args::parse_object_streaming(json.trim())?;
        let name = call
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::Malformed("tool call missing function name".into()))?;
        let mut input = ToolInput::new(name);
        let arguments = call.get("parameters").or_else(|| call.get("arguments"));
        input.arguments = args::normalise_arguments(name, arguments)?;
        Ok(Message::tool_call(input))
    }

    fn decode_output(&self, raw: &[u8], streaming: bool) -> Result<Message, DecodeError> {
        let text = decode_utf8(raw)?;

        let assistant_header = format!("{START_HEADER}assistant{END_HEADER}");
        let mut body = text.trim_start();
        body = body.strip_prefix(assistant_header.as_str()).unwrap_or(body);
        body = body.trim_end();
        for end in [EOT, EOM, END_OF_TEXT] {
            body = body.strip_suffix(end).unwrap_or(body);
        }
        let body = if streaming {
            render::trim_partial_marker(body, &[FUNCTION_OPEN])
        } else {
            body
        };

        if body.contains(FUNCTION_OPEN) {
            return self.decode_function_calls(body);
        }
        if let Some(at) = body.find(PYTHON_TAG) {
            return self.decode_python_tag(&body[at + PYTHON_TAG.len()..]);
        }

        Ok(Message::assistant(body.trim()))
    }
}

impl Default for Llama3Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for Llama3Codec {
    fn name(&self) -> &str {
        "llama3.1"
    }

    fn encode(&self, messages: &[Message]) -> Result<Vec<u8>, EncodeError> {
        let preamble = render::preamble(messages)?;

        let mut out = String::from(BEGIN_OF_TEXT);
        out.push_str(&header("system"));
        out.push_str("Environment: ipython\n");
        out.push_str("Cutting Knowledge Date: December 2023\n");
        out.push_str(&format!(
            "Today Date: {}\n\n",
            self.current_date.format("%d %b %Y")
        ));
        out.push_str(&preamble.instructions);
        if preamble.has_tools() {
            if !preamble.instructions.is_empty() {
                out.push_str("\n\n");
            }
            let namespace = render::typescript_namespace(preamble.tools)?;
            out.push_str(&tool_instructions(&namespace));
        }
        out.push_str(EOT);

        for (i, message) in messages.iter().enumerate() {
            if preamble.index == Some(i) {
                continue;
            }
            match message.role {
                Role::System | Role::User => {
                    out.push_str(&header(message.role.as_str()));
                    out.push_str(&message.text());
                    out.push_str(EOT);
                }
                Role::Assistant => {
                    out.push_str(&header("assistant"));
                    let mut parts = Vec::with_capacity(message.content.len());
                    let mut calls_tool = false;
                    for content in &message.content {
                        match content {
                            Content::Text(text) => parts.push(text.clone()),
                            Content::ToolInput(input) => {
                                calls_tool = true;
                                parts.push(format!(
                                    "{FUNCTION_OPEN}{}>{}{FUNCTION_CLOSE}",
                                    input.name,
                                    args::arguments_json(input)?
                                ));
                            }
                            _ => {}
                        }
                    }
                    out.push_str(&parts.join("\n"));
                    out.push_str(if calls_tool { EOM } else { EOT });
                }
                Role::Tool => {
                    // Adjacent results share one ipython turn.
                    if i > 0 && messages[i - 1].role == Role::Tool {
                        out.push('\n');
                    } else {
                        out.push_str(&header("ipython"));
                    }
                    out.push_str(&render::tool_message_text(message));
                    if messages.get(i + 1).is_none_or(|next| next.role != Role::Tool) {
                        out.push_str(EOT);
                    }
                }
                Role::Unknown => {
                    return Err(EncodeError::UnsupportedRole(message.role.to_string()));
                }
            }
        }

        if matches!(messages.last(), Some(last) if last.role != Role::Assistant) {
            out.push_str(&header("assistant"));
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
