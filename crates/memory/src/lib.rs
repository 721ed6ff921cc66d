//! Conversation context implementations for Toolweave.

pub mod in_memory;

pub use in_memory::InMemoryContext;
