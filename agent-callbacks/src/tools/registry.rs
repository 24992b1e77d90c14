use crate::error::ToolError;
use crate::tools::types::{ToolContext, ToolDefinition};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool definition for the model
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool with the given parameters.
    ///
    /// Business outcomes, failures included, are ordinary JSON results. `Err` is kept for
    /// malformed parameters and remote failures.
    async fn execute(&self, params: Value, context: &ToolContext<'_>) -> Result<Value, ToolError>;

    /// Returns the tool's name
    fn name(&self) -> String {
        self.definition().name
    }
}

/// Registry that holds all available tools.
/// Uses interior mutability (RwLock) so tools can be registered after the pipeline that
/// shares the registry was built.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        log::debug!("[TOOLS] Registered tool: {}", name);
        self.tools.write().insert(name, tool);
    }

    /// Unregister a tool by name. Returns true if it was present.
    pub fn unregister(&self, name: &str) -> bool {
        self.tools.write().remove(name).is_some()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// List all registered tools
    pub fn list(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.read().values().cloned().collect()
    }

    /// Definitions for the model, sorted by name so requests are stable
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.read().values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Echo the input back")
        }

        async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
            Ok(params)
        }
    }

    struct AlphaTool;

    #[async_trait]
    impl Tool for AlphaTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("alpha", "First in line")
        }

        async fn execute(&self, _params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
            Ok(json!("alpha"))
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(AlphaTool));

        assert_eq!(registry.len(), 2);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());

        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "echo"]);

        assert!(registry.unregister("echo"));
        assert!(!registry.unregister("echo"));
    }
}
