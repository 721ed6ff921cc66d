//! GPT-OSS "Harmony" prompt format.
//!
//! Every segment is `<|start|>AUTHOR<|message|>…<|end|>`. Assistant output is
//! split over channels: `analysis` (reasoning), `commentary` (tool calls) and
//! `final` (the answer). The system segment carries the model identity and the
//! channel rules; instructions and tool signatures go into a separate
//! developer segment.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex_lite::Regex;
use serde_json::Value;
use toolweave_core::{decode_utf8, Codec, Content, DecodeError, EncodeError, Message, Role, ToolInput};

use crate::args;
use crate::render::{self, THINK_START};
use crate::CodecConfigError;

const START: &str = "<|start|>";
const END: &str = "<|end|>";
const MESSAGE: &str = "<|message|>";
const CHANNEL: &str = "<|channel|>";
const CONSTRAIN_JSON: &str = "<|constrain|>json";
const CALL: &str = "<|call|>";
const RETURN: &str = "<|return|>";
const ASSISTANT_START: &str = "<|start|>assistant";
const TO_FUNCTIONS: &str = "to=functions.";
const JSON_FENCE: &str = "```json";

const IDENTITY: &str = "You are ChatGPT, a large language model trained by OpenAI.\nKnowledge cutoff: 2024-06\n";
const CHANNEL_RULES: &str =
    "# Valid channels: analysis, commentary, final. Channel must be included for every message.";
const TOOL_CHANNEL_RULE: &str = "Calls to these tools must go to the commentary channel: 'functions'.";

static JSON_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").unwrap());

static CHANNEL_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|channel\|>[^<]*<\|message\|>").unwrap());

static CHANNEL_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|channel\|>([A-Za-z]+)[^<]*<\|message\|>").unwrap());

/// How much reasoning the system segment asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl std::fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasoningEffort {
    type Err = CodecConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            _ => Err(CodecConfigError::UnknownReasoningEffort(s.to_string())),
        }
    }
}

/// Codec for gpt-oss models.
#[derive(Debug, Clone)]
pub struct GptOssCodec {
    current_date: NaiveDate,
    reasoning_effort: ReasoningEffort,
}

impl GptOssCodec {
    pub fn new() -> Self {
        Self {
            current_date: Local::now().date_naive(),
            reasoning_effort: ReasoningEffort::default(),
        }
    }

    /// Pin the date shown in the system segment.
    pub fn with_current_date(mut self, date: NaiveDate) -> Self {
        self.current_date = date;
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = effort;
        self
    }

    fn system_segment(&self, has_tools: bool) -> String {
        let mut out = format!("{START}system{MESSAGE}{IDENTITY}");
        out.push_str(&format!(
            "Current date: {}\n\nReasoning: {}\n\n",
            self.current_date.format("%Y-%m-%d"),
            self.reasoning_effort
        ));
        out.push_str(CHANNEL_RULES);
        if has_tools {
            out.push('\n');
            out.push_str(TOOL_CHANNEL_RULE);
        }
        out.push_str(END);
        out
    }

    /// ```` ```json {"function": …, "arguments": {…}} ``` ````
    fn decode_json_block(&self, body: &str) -> Result<Message, DecodeError> {
        let Some(caps) = JSON_BLOCK_RE.captures(body) else {
            return Err(DecodeError::Partial("json code block still streaming".into()));
        };
        let call = args::parse_object(&caps[1])?;
        let name = call
            .get("function")
            .or_else(|| call.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::Malformed("tool call missing function name".into()))?;
        let mut input = ToolInput::new(name);
        input.arguments = args::normalise_arguments(name, call.get("arguments"))?;
        Ok(Message::tool_call(input))
    }

    /// `…commentary to=functions.NAME <|constrain|>json<|message|>{…}<|call|>`
    fn decode_recipient_call(&self, body: &str, at: usize) -> Result<Message, DecodeError> {
        let after = &body[at + TO_FUNCTIONS.len()..];
        let name_end = after
            .find(|c: char| c.is_whitespace() || c == '<')
            .unwrap_or(after.len());
        let name = &after[..name_end];

        let Some(message_at) = after.find(MESSAGE) else {
            return Err(DecodeError::Partial("tool call header still streaming".into()));
        };
        if name.is_empty() {
            return Err(DecodeError::Malformed("tool call recipient has no name".into()));
        }

        let payload = &after[message_at + MESSAGE.len()..];
        let (payload, closed) = match payload.find(CALL) {
            Some(end) => (payload[..end].trim(), true),
            None => (payload.trim(), false),
        };
        let arguments = match (payload.is_empty(), closed) {
            (true, true) => Value::Null,
            (true, false) => {
                return Err(DecodeError::Partial("tool call arguments still streaming".into()));
            }
            (false, true) => Value::Object(args::parse_object(payload)?),
            (false, false) => Value::Object(args::parse_object_streaming(payload)?),
        };

        let mut input = ToolInput::new(name);
        input.arguments = args::normalise_arguments(name, Some(&arguments))?;
        Ok(Message::tool_call(input))
    }

    /// Collect analysis/commentary text and final text into separate items.
    fn decode_channels(&self, body: &str) -> Message {
        let mut analysis: Vec<&str> = Vec::new();
        let mut final_text: Option<String> = None;

        for caps in CHANNEL_HEADER_RE.captures_iter(body) {
            let (Some(whole), Some(channel)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let rest = &body[whole.end()..];
            let end = [END, START, CHANNEL, CALL, RETURN]
                .iter()
                .filter_map(|token| rest.find(*token))
                .min()
                .unwrap_or(rest.len());
            let section = rest[..end].trim();

            match channel.as_str() {
                "final" => match final_text.as_mut() {
                    Some(text) if !section.is_empty() => {
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(section);
                    }
                    Some(_) => {}
                    None => final_text = Some(section.to_string()),
                },
                _ if !section.is_empty() => analysis.push(section),
                _ => {}
            }
        }

        let mut content = Vec::with_capacity(2);
        if !analysis.is_empty() {
            content.push(Content::Text(analysis.join("\n")));
        }
        let is_final = final_text.is_some();
        if let Some(text) = final_text {
            content.push(Content::Text(text));
        }
        if content.is_empty() {
            content.push(Content::Text(String::new()));
        }

        Message {
            role: Role::Assistant,
            content,
            is_final,
        }
    }

    fn decode_output(&self, raw: &[u8], streaming: bool) -> Result<Message, DecodeError> {
        let text = render::strip_think(decode_utf8(raw)?);

        let mut body = text.trim();
        body = body.strip_prefix(ASSISTANT_START).unwrap_or(body);
        for end in [END, RETURN] {
            body = body.strip_suffix(end).unwrap_or(body).trim_end();
        }
        let body = if streaming {
            render::trim_partial_marker(body, &[THINK_START])
        } else {
            body
        };

        if body.contains(JSON_FENCE) {
            return self.decode_json_block(body);
        }
        if let Some(at) = body.find(TO_FUNCTIONS) {
            return self.decode_recipient_call(body, at);
        }
        if body.contains(CHANNEL) {
            return Ok(self.decode_channels(body));
        }

        Ok(Message::assistant(strip_channel_markers(body).trim()))
    }
}

impl Default for GptOssCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_channel_markers(text: &str) -> String {
    CHANNEL_MARKER_RE
        .replace_all(text, "")
        .replace(CONSTRAIN_JSON, "")
        .replace(CALL, "")
}

impl Codec for GptOssCodec {
    fn name(&self) -> &str {
        "gpt-oss"
    }

    fn encode(&self, messages: &[Message]) -> Result<Vec<u8>, EncodeError> {
        let preamble = render::preamble(messages)?;
        let last_user = messages.iter().rposition(|m| m.role == Role::User);

        let mut out = self.system_segment(preamble.has_tools());

        if !preamble.instructions.is_empty() || preamble.has_tools() {
            let mut sections = Vec::with_capacity(2);
            if !preamble.instructions.is_empty() {
                sections.push(format!("# Instructions\n\n{}", preamble.instructions));
            }
            if preamble.has_tools() {
                sections.push(format!(
                    "# Tools\n\n## functions\n\n{}",
                    render::typescript_namespace(preamble.tools)?
                ));
            }
            out.push_str(&format!("{START}developer{MESSAGE}{}{END}", sections.join("\n\n")));
        }

        for (i, message) in messages.iter().enumerate() {
            match message.role {
                Role::System if preamble.index == Some(i) => {}
                Role::System => {
                    out.push_str(&format!("{START}developer{MESSAGE}{}{END}", message.text()));
                }
                Role::User => {
                    out.push_str(&format!("{START}user{MESSAGE}{}{END}", message.text()));
                }
                Role::Assistant => {
                    let is_last = i + 1 == messages.len();
                    // A non-final chunk followed by more assistant output is reasoning.
                    let is_analysis = !message.is_final
                        && messages.get(i + 1).is_some_and(|next| next.role == Role::Assistant);
                    let keep_analysis = last_user.is_none_or(|u| i > u);

                    for content in &message.content {
                        match content {
                            Content::Text(text) if is_analysis => {
                                if keep_analysis {
                                    out.push_str(&format!(
                                        "{ASSISTANT_START}{CHANNEL}analysis{MESSAGE}{text}{END}"
                                    ));
                                }
                            }
                            Content::Text(text) => {
                                out.push_str(&format!(
                                    "{ASSISTANT_START}{CHANNEL}final{MESSAGE}{text}"
                                ));
                                if !is_last {
                                    out.push_str(END);
                                }
                            }
                            Content::ToolInput(input) => {
                                out.push_str(&format!(
                                    "{ASSISTANT_START}{CHANNEL}commentary {TO_FUNCTIONS}{} {CONSTRAIN_JSON}{MESSAGE}{}{CALL}",
                                    input.name,
                                    args::arguments_json(input)?
                                ));
                            }
                            _ => {}
                        }
                    }
                }
                Role::Tool => {
                    for content in &message.content {
                        let (author, text) = match content {
                            Content::ToolOutput(output) if !output.name.is_empty() => {
                                (output.name.as_str(), render::tool_output_text(output))
                            }
                            Content::ToolOutput(output) => {
                                ("tool_result", render::tool_output_text(output))
                            }
                            Content::Text(text) => ("tool_result", text.clone()),
                            _ => continue,
                        };
                        out.push_str(&format!(
                            "{START}functions.{author} to=assistant{CHANNEL}commentary{MESSAGE}{text}{END}"
                        ));
                    }
                }
                Role::Unknown => {
                    return Err(EncodeError::UnsupportedRole(message.role.to_string()));
                }
            }
        }

        if matches!(messages.last(), Some(last) if last.role != Role::Assistant) {
            out.push_str(ASSISTANT_START);
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
