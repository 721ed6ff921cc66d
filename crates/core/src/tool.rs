//! Tool traits: the abstraction over agent capabilities.
//!
//! The runner only sees a [`ToolExecutor`]: something that can list the
//! tools it offers and answer a [`ToolInput`] with a [`ToolOutput`].
//! [`ToolRegistry`] is the reference executor, built from individual
//! [`Tool`] implementations.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::ToolError;
use crate::message::{ToolInput, ToolOutput, ToolSchema};

/// The capability the agent loop depends on.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Every tool this executor can run, in a stable order.
    async fn list(&self) -> std::result::Result<Vec<ToolSchema>, ToolError>;

    /// Run one tool call.
    async fn call(&self, input: &ToolInput) -> std::result::Result<ToolOutput, ToolError>;
}

/// A single tool.
///
/// Tools are registered in the [`ToolRegistry`] and made available to the
/// agent loop through it.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "datetime").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the decoded call.
    async fn execute(&self, input: &ToolInput) -> std::result::Result<ToolOutput, ToolError>;

    /// Convert this tool into the schema announced to the model.
    fn to_schema(&self) -> ToolSchema {
        ToolSchema::new(self.name(), self.description(), self.parameters_schema())
    }
}

/// A registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: Box<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool schemas, sorted by name.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.to_schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn list(&self) -> std::result::Result<Vec<ToolSchema>, ToolError> {
        Ok(self.schemas())
    }

    async fn call(&self, input: &ToolInput) -> std::result::Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(&input.name)
            .ok_or_else(|| ToolError::NotFound(input.name.clone()))?;

        tracing::debug!(tool = %input.name, id = %input.id, "Executing tool");
        let mut output = tool.execute(input).await?;
        if output.name.is_empty() {
            output.name = input.name.clone();
        }
        if output.id.is_empty() {
            output.id = input.id.clone();
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, input: &ToolInput) -> std::result::Result<ToolOutput, ToolError> {
            let text = input
                .argument("text")
                .ok_or_else(|| ToolError::InvalidArguments("missing 'text'".into()))?;
            Ok(ToolOutput::text("", text))
        }
    }

    struct NoopTool;

    #[async_trait]
    impl Tool for NoopTool {
        fn name(&self) -> &str { "noop" }
        fn description(&self) -> &str { "Does nothing" }
        fn parameters_schema(&self) -> serde_json::Value { serde_json::Value::Null }
        async fn execute(&self, _input: &ToolInput) -> std::result::Result<ToolOutput, ToolError> {
            Ok(ToolOutput::new("noop", vec![]))
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[tokio::test]
    async fn registry_lists_schemas_sorted() {
        let registry = ToolRegistry::new()
            .with_tool(Box::new(NoopTool))
            .with_tool(Box::new(EchoTool));
        let schemas = registry.list().await.unwrap();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].name, "echo");
        assert_eq!(schemas[1].name, "noop");
        assert_eq!(registry.names(), vec!["echo", "noop"]);
    }

    #[tokio::test]
    async fn registry_call_stamps_id_and_name() {
        let registry = ToolRegistry::new().with_tool(Box::new(EchoTool));

        let input = ToolInput::new("echo")
            .with_id("call_1")
            .with_argument("text", "hello world");
        let output = registry.call(&input).await.unwrap();
        assert_eq!(output.id, "call_1");
        assert_eq!(output.name, "echo");
        assert_eq!(
            output.content,
            vec![crate::message::OutputContent::Text { text: "hello world".into() }]
        );
    }

    #[tokio::test]
    async fn registry_call_missing_tool() {
        let registry = ToolRegistry::new();
        let err = registry.call(&ToolInput::new("nonexistent")).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn registry_call_propagates_tool_error() {
        let registry = ToolRegistry::new().with_tool(Box::new(EchoTool));
        let err = registry.call(&ToolInput::new("echo")).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
