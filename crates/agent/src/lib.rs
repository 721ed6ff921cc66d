//! The agent loop for Toolweave.
//!
//! A [`Runner`] repeats one cycle until the model answers without a tool
//! call or the turn budget runs out:
//!
//! 1. **Read** the full history from the [`Context`](toolweave_core::Context)
//! 2. **Encode** it with the dialect's [`Codec`](toolweave_core::Codec)
//! 3. **Compute**: stream raw output from the inference engine
//! 4. **Decode** the output back into a message
//! 5. **If tool calls**: execute them, push the results, loop back to 1
//! 6. **Otherwise**: mark the answer final and return
//!
//! Streaming invocations feed each chunk through a [`StreamAccumulator`] and
//! forward only new text to a [`MessageSink`].

pub mod accumulator;
pub mod agent;
pub mod runner;
pub mod sink;

pub use accumulator::StreamAccumulator;
pub use agent::Agent;
pub use runner::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_TURNS, Runner};
pub use sink::{ChannelSink, JsonWriter, MessageSink, SinkError, WriterFormat};
