//! A named agent: instructions, a runner and the conversation it owns.

use toolweave_core::{Content, Context, Message, Result, Role};

use crate::runner::Runner;
use crate::sink::MessageSink;

pub struct Agent {
    name: String,
    runner: Runner,
    context: Box<dyn Context>,
}

impl Agent {
    /// Create an agent and seed `context` with its system message: the
    /// instructions followed by the runner's tool catalog.
    pub async fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        runner: Runner,
        context: Box<dyn Context>,
    ) -> Result<Self> {
        let name = name.into();
        let tools = runner.tools().list().await?;
        tracing::debug!(agent = %name, tools = tools.len(), "Creating agent");

        let system = Message::new(
            Role::System,
            vec![Content::Text(instructions.into()), Content::ToolCatalog(tools)],
        );
        context.push(vec![system]).await?;

        Ok(Self {
            name,
            runner,
            context,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Send a user message and run the loop to completion.
    pub async fn invoke(&self, text: impl Into<String>) -> Result<Vec<Message>> {
        self.runner
            .invoke(self.context.as_ref(), Message::user(text))
            .await
    }

    /// Send a user message, streaming intermediate messages to `sink`.
    pub async fn invoke_stream(
        &self,
        text: impl Into<String>,
        sink: &mut dyn MessageSink,
    ) -> Result<Vec<Message>> {
        self.runner
            .invoke_stream(self.context.as_ref(), Message::user(text), sink)
            .await
    }

    /// The full conversation so far, system message included.
    pub async fn history(&self) -> Result<Vec<Message>> {
        Ok(self.context.messages().await?)
    }
}
