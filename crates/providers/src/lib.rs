//! Inference engine adapters for Toolweave.
//!
//! All engines implement the `toolweave_core::InferenceEngine` trait. The
//! engine receives an already-encoded prompt and streams raw completion
//! bytes back; it knows nothing about messages or tools.

pub mod completion_server;

pub use completion_server::CompletionServerEngine;
