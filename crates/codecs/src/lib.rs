//! # Toolweave Codecs
//!
//! Prompt codecs for the supported model families. Each dialect is an
//! independent [`Codec`] implementation; [`Dialect`] picks one at
//! configuration time.
//!
//! | dialect | codec |
//! |---|---|
//! | `llama3.1` | [`Llama3Codec`] |
//! | `qwen2.5`, `qwen3` | [`QwenCodec`] |
//! | `gpt-oss` | [`GptOssCodec`] |

pub mod gpt_oss;
pub mod llama3;
pub mod qwen;

mod args;
mod render;

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use toolweave_core::Codec;

pub use gpt_oss::{GptOssCodec, ReasoningEffort};
pub use llama3::Llama3Codec;
pub use qwen::{QwenCodec, QwenVersion};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecConfigError {
    #[error("Unknown dialect: {0} (expected llama3.1, qwen2.5, qwen3 or gpt-oss)")]
    UnknownDialect(String),

    #[error("Unknown reasoning effort: {0} (expected low, medium or high)")]
    UnknownReasoningEffort(String),
}

/// A model family's chat-template syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    Llama31,
    Qwen25,
    Qwen3,
    GptOss,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [Dialect::Llama31, Dialect::Qwen25, Dialect::Qwen3, Dialect::GptOss];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Llama31 => "llama3.1",
            Dialect::Qwen25 => "qwen2.5",
            Dialect::Qwen3 => "qwen3",
            Dialect::GptOss => "gpt-oss",
        }
    }

    /// Build the codec for this dialect.
    pub fn build(&self, options: &CodecOptions) -> Arc<dyn Codec> {
        tracing::debug!(dialect = %self, "Building codec");
        match self {
            Dialect::Llama31 => {
                let mut codec = Llama3Codec::new();
                if let Some(date) = options.current_date {
                    codec = codec.with_current_date(date);
                }
                Arc::new(codec)
            }
            Dialect::Qwen25 => Arc::new(QwenCodec::qwen2_5()),
            Dialect::Qwen3 => Arc::new(QwenCodec::qwen3()),
            Dialect::GptOss => {
                let mut codec = GptOssCodec::new().with_reasoning_effort(options.reasoning_effort);
                if let Some(date) = options.current_date {
                    codec = codec.with_current_date(date);
                }
                Arc::new(codec)
            }
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = CodecConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "llama3.1" | "llama-3.1" | "llama3" => Ok(Dialect::Llama31),
            "qwen2.5" | "qwen-2.5" => Ok(Dialect::Qwen25),
            "qwen3" | "qwen-3" => Ok(Dialect::Qwen3),
            "gpt-oss" | "gptoss" | "harmony" => Ok(Dialect::GptOss),
            _ => Err(CodecConfigError::UnknownDialect(s.to_string())),
        }
    }
}

/// Knobs shared by the codec constructors.
#[derive(Debug, Clone, Default)]
pub struct CodecOptions {
    /// Date shown in system headers; today when unset.
    pub current_date: Option<NaiveDate>,

    /// GPT-OSS reasoning effort.
    pub reasoning_effort: ReasoningEffort,
}
