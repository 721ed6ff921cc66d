//! Built-in tool implementations for Toolweave.
//!
//! Tools give the agent the ability to look things up outside the model.
//! Only `datetime` ships here; callers register their own tools on the
//! returned [`ToolRegistry`].

pub mod datetime;

use toolweave_core::tool::ToolRegistry;

pub use datetime::DateTimeTool;

/// Create a tool registry with all built-in tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(DateTimeTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolweave_core::message::ToolInput;
    use toolweave_core::tool::ToolExecutor;

    #[tokio::test]
    async fn default_registry_lists_datetime() {
        let registry = default_registry();
        let schemas = registry.list().await.unwrap();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "datetime");
        assert_eq!(schemas[0].description, "Provides the current date and time.");
    }

    #[tokio::test]
    async fn default_registry_runs_datetime() {
        let registry = default_registry();
        let output = registry
            .call(&ToolInput::new("datetime").with_id("call_7"))
            .await
            .unwrap();
        assert_eq!(output.id, "call_7");
        assert_eq!(output.name, "datetime");
    }
}
