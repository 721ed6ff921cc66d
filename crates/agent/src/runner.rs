//! The agent loop.
//!
//! One invocation runs `encode → compute → decode → (tool call → encode …)`
//! strictly in sequence against a single [`Context`]. The only suspension
//! point is the token stream read.

use std::sync::Arc;

use toolweave_core::error::DecodeError;
use toolweave_core::{
    Codec, Content, Context, Error, InferenceEngine, Message, Result, ToolExecutor, ToolInput,
};
use tracing::{debug, info, warn};

use crate::accumulator::StreamAccumulator;
use crate::sink::MessageSink;

/// Default number of tool-call turns before giving up.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Default size of a single token stream read, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Drives a codec, an inference engine and a tool executor over a context.
pub struct Runner {
    codec: Arc<dyn Codec>,
    engine: Arc<dyn InferenceEngine>,
    tools: Arc<dyn ToolExecutor>,
    max_turns: usize,
    chunk_size: usize,
}

impl Runner {
    pub fn new(
        codec: Arc<dyn Codec>,
        engine: Arc<dyn InferenceEngine>,
        tools: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            codec,
            engine,
            tools,
            max_turns: DEFAULT_MAX_TURNS,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the maximum number of tool-call turns.
    ///
    /// The model is invoked at most `max_turns + 1` times per invocation.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Set the token stream read size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    pub fn tools(&self) -> &Arc<dyn ToolExecutor> {
        &self.tools
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Run one invocation and return the messages it produced, assistant
    /// and tool messages interleaved in the order they were pushed.
    pub async fn invoke(&self, context: &dyn Context, message: Message) -> Result<Vec<Message>> {
        self.run(context, message, None).await
    }

    /// Like [`Runner::invoke`], forwarding deltas, tool messages and an
    /// end-of-turn marker to `sink` as they happen.
    pub async fn invoke_stream(
        &self,
        context: &dyn Context,
        message: Message,
        sink: &mut dyn MessageSink,
    ) -> Result<Vec<Message>> {
        self.run(context, message, Some(sink)).await
    }

    async fn run(
        &self,
        context: &dyn Context,
        message: Message,
        mut sink: Option<&mut (dyn MessageSink + '_)>,
    ) -> Result<Vec<Message>> {
        info!(
            codec = self.codec.name(),
            engine = self.engine.name(),
            max_turns = self.max_turns,
            "Starting invocation"
        );

        context.push(vec![message]).await?;
        let mut produced = Vec::new();

        for turn in 0..=self.max_turns {
            let history = context.messages().await?;
            let prompt = self.codec.encode(&history)?;
            debug!(turn, history = history.len(), prompt_bytes = prompt.len(), "Model turn");

            let raw = self.read_output(&prompt, sink.as_deref_mut()).await?;
            let mut decoded = self.codec.decode(&raw).map_err(|e| match e {
                DecodeError::Partial(reason) => {
                    DecodeError::Malformed(format!("Model output ended early: {reason}"))
                }
                other => other,
            })?;
            stamp_call_ids(&mut decoded);

            let calls: Vec<ToolInput> = decoded.tool_inputs().cloned().collect();
            let mut batch = split_channels(decoded);
            if calls.is_empty()
                && let Some(last) = batch.last_mut()
            {
                last.is_final = true;
            }
            context.push(batch.clone()).await?;
            produced.extend(batch);

            for call in &calls {
                debug!(turn, tool = %call.name, id = %call.id, "Calling tool");
                let output = match self.tools.call(call).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "Tool call failed");
                        return Err(e.into());
                    }
                };
                let mut output = output.with_id(call.id.clone());
                output.name = call.name.clone();

                let result = Message::tool_output(output);
                context.push(vec![result.clone()]).await?;
                forward(&mut sink, &result);
                produced.push(result);
            }

            forward(&mut sink, &Message::assistant("").finalized());

            if calls.is_empty() {
                info!(turns = turn + 1, produced = produced.len(), "Invocation complete");
                return Ok(produced);
            }
        }

        warn!(max_turns = self.max_turns, "Turn limit reached");
        Err(Error::TurnLimitExceeded {
            max_turns: self.max_turns,
        })
    }

    /// Drain one completion, feeding the accumulator when streaming.
    async fn read_output(
        &self,
        prompt: &[u8],
        mut sink: Option<&mut (dyn MessageSink + '_)>,
    ) -> Result<Vec<u8>> {
        let mut stream = self.engine.compute(prompt).await?;
        let mut accumulator = StreamAccumulator::new();
        let mut raw = Vec::new();

        while let Some(chunk) = stream.read(self.chunk_size).await? {
            if sink.is_some() {
                for delta in accumulator.push(&chunk, self.codec.as_ref()) {
                    forward(&mut sink, &delta);
                }
            }
            raw.extend_from_slice(&chunk);
        }
        if sink.is_some() {
            for delta in accumulator.finish(self.codec.as_ref()) {
                forward(&mut sink, &delta);
            }
        }
        Ok(raw)
    }
}

/// Give every tool call without an id a fresh one.
fn stamp_call_ids(message: &mut Message) {
    for item in &mut message.content {
        if let Content::ToolInput(input) = item
            && input.id.is_empty()
        {
            input.id = format!("call_{}", uuid::Uuid::new_v4().simple());
        }
    }
}

/// Split a message made only of text items into one message per item,
/// the last one marked final.
fn split_channels(message: Message) -> Vec<Message> {
    let all_text = message.content.iter().all(|c| matches!(c, Content::Text(_)));
    if message.content.len() < 2 || !all_text {
        return vec![message];
    }

    let count = message.content.len();
    let role = message.role;
    message
        .content
        .into_iter()
        .enumerate()
        .map(|(i, item)| Message {
            role,
            content: vec![item],
            is_final: i + 1 == count,
        })
        .collect()
}

fn forward(sink: &mut Option<&mut (dyn MessageSink + '_)>, message: &Message) {
    if let Some(sink) = sink.as_deref_mut()
        && let Err(e) = sink.send(message)
    {
        warn!(error = %e, "Failed to forward streamed message");
    }
}
