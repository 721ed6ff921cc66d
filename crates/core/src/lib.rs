//! # Toolweave Core
//!
//! Message model, error definitions and collaborator traits for the Toolweave
//! agent runtime. This crate has no runtime dependencies beyond serde and
//! tokio's sync primitives; it defines the domain model that all other crates
//! implement against.
//!
//! ## Collaborators
//!
//! The agent loop is wired from four traits defined here:
//! - [`Codec`]: messages ⇄ model-specific prompt text
//! - [`InferenceEngine`] / [`TokenStream`]: prompt → raw output bytes
//! - [`ToolExecutor`]: tool call → tool result
//! - [`Context`]: the conversation history

pub mod codec;
pub mod context;
pub mod error;
pub mod inference;
pub mod message;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use codec::{decode_utf8, Codec};
pub use context::Context;
pub use error::{
    ContextError, DecodeError, EncodeError, Error, InferenceError, Result, ToolError,
};
pub use inference::{ChannelTokenStream, InferenceEngine, TokenStream};
pub use message::{
    Content, Message, MessageError, OutputContent, ResourceContents, Role, ToolInput, ToolOutput,
    ToolSchema,
};
pub use tool::{Tool, ToolExecutor, ToolRegistry};
