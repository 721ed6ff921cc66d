//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use toolweave_codecs::Llama3Codec;
use toolweave_core::error::{InferenceError, ToolError};
use toolweave_core::{
    ChannelTokenStream, Codec, InferenceEngine, Tool, ToolInput, ToolOutput, ToolRegistry,
    TokenStream,
};

/// Replays canned model outputs; once the script runs out the last entry
/// repeats.
pub struct ScriptedEngine {
    outputs: Vec<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new(outputs: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn compute(&self, prompt: &[u8]) -> Result<Box<dyn TokenStream>, InferenceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(prompt).into_owned());
        let output = self
            .outputs
            .get(call)
            .or(self.outputs.last())
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(ChannelTokenStream::from_bytes(output)))
    }
}

/// A `datetime` tool that remembers every call and always answers "Monday".
#[derive(Clone, Default)]
pub struct RecordingTool {
    pub calls: Arc<Mutex<Vec<ToolInput>>>,
}

impl RecordingTool {
    pub fn recorded(&self) -> Vec<ToolInput> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        "datetime"
    }

    fn description(&self) -> &str {
        "Provides the current date and time."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push(input.clone());
        Ok(ToolOutput::text("datetime", "Monday"))
    }
}

pub fn registry(tool: &RecordingTool) -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::new().with_tool(Box::new(tool.clone())))
}

pub fn llama() -> Arc<dyn Codec> {
    Arc::new(Llama3Codec::new().with_current_date(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()))
}

pub const TOOL_CALL: &str = "<function=datetime>{}</function><|eom_id|>";
