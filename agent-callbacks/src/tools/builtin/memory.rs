//! Long-term memory search
//!
//! Looks through the user's earlier sessions that the memory hook saved.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::memory::MemoryService;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_params, PropertySchema, ToolContext, ToolDefinition};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct LoadMemoryParams {
    query: String,
    limit: Option<usize>,
}

pub struct LoadMemoryTool {
    memory: Arc<MemoryService>,
}

impl LoadMemoryTool {
    pub fn new(memory: Arc<MemoryService>) -> Self {
        LoadMemoryTool { memory }
    }
}

#[async_trait]
impl Tool for LoadMemoryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "load_memory",
            "Search past conversations with this customer for preferences, recommendations and personal details",
        )
        .param(
            "query",
            PropertySchema::string("Words to look for; entries sharing any word are returned"),
            true,
        )
        .param(
            "limit",
            PropertySchema::integer("Maximum number of entries to return (default: 10, max: 50)"),
            false,
        )
    }

    async fn execute(&self, params: Value, context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: LoadMemoryParams = parse_params(params)?;
        if params.query.trim().is_empty() {
            return Err(ToolError::InvalidParameters("query cannot be empty".to_string()));
        }
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let state = context.state;
        let memories = self
            .memory
            .search(state.app_name(), state.user_id(), &params.query, limit);
        log::info!(
            "[TOOLS] Memory search for {} matched {} entr{}: {}",
            state.user_id(),
            memories.len(),
            if memories.len() == 1 { "y" } else { "ies" },
            params.query
        );

        if memories.is_empty() {
            return Ok(json!({
                "memories": [],
                "message": "No memories found. This is our first conversation!",
            }));
        }
        Ok(json!({ "memories": memories }))
    }
}
