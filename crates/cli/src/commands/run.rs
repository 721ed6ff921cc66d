//! `toolweave run`: one invocation of the configured agent.

use std::sync::Arc;

use toolweave_agent::{Agent, JsonWriter, Runner, WriterFormat};
use toolweave_config::{AppConfig, StreamFormat};
use toolweave_core::{Message, Role};
use toolweave_memory::InMemoryContext;
use toolweave_providers::CompletionServerEngine;

pub async fn run(message: String, stream: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let dialect = config.dialect()?;
    let codec = dialect.build(&config.codec_options()?);

    let engine = CompletionServerEngine::new(&config.inference.server_url)
        .with_max_tokens(config.inference.max_tokens)
        .with_temperature(config.inference.temperature)
        .with_stop(config.inference.stop.clone());
    let tools = Arc::new(toolweave_tools::default_registry());

    let runner = Runner::new(codec, Arc::new(engine), tools)
        .with_max_turns(config.agent.max_turns)
        .with_chunk_size(config.agent.chunk_size);

    tracing::info!(
        agent = %config.agent.name,
        dialect = %dialect,
        server = %config.inference.server_url,
        "Running agent"
    );

    let agent = Agent::new(
        config.agent.name.clone(),
        config.agent.instructions.clone(),
        runner,
        Box::new(InMemoryContext::new()),
    )
    .await?;

    if stream {
        let mut writer = JsonWriter::new(std::io::stdout(), writer_format(config.stream.format));
        agent.invoke_stream(message, &mut writer).await?;
    } else {
        let produced = agent.invoke(message).await?;
        println!("{}", final_answer(&produced));
    }

    Ok(())
}

fn writer_format(format: StreamFormat) -> WriterFormat {
    match format {
        StreamFormat::Raw => WriterFormat::Raw,
        StreamFormat::Sse => WriterFormat::Sse,
    }
}

/// Text of the last final assistant message.
fn final_answer(produced: &[Message]) -> String {
    produced
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant && m.is_final)
        .map(Message::text)
        .unwrap_or_default()
}
