//! Mock image studio
//!
//! No image is rendered. Each generation records an entry in the session's
//! `generated_images` index, keyed by file name, which `list_generated_images` reads back.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::ToolError;
use crate::state::Scope;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_params, PropertySchema, ToolContext, ToolDefinition};

pub const IMAGE_INDEX_KEY: &str = "generated_images";
pub const LAST_IMAGE_KEY: &str = "last_generated_image";
pub const IMAGE_PREFIX: &str = "generated_image_";

#[derive(Debug, Deserialize)]
struct GenerateParams {
    prompt: String,
}

pub struct GenerateImageTool {
    /// Remaining simulated backend failures, used to exercise retries
    failures_left: AtomicU32,
}

impl GenerateImageTool {
    pub fn new() -> Self {
        GenerateImageTool {
            failures_left: AtomicU32::new(0),
        }
    }

    /// Fail the first `count` calls with a retryable remote error
    pub fn with_transient_failures(count: u32) -> Self {
        GenerateImageTool {
            failures_left: AtomicU32::new(count),
        }
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for GenerateImageTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("generate_image", "Generate an image from a text description")
            .param("prompt", PropertySchema::string("Text description of the image to generate"), true)
    }

    async fn execute(&self, params: Value, context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: GenerateParams = parse_params(params)?;
        if params.prompt.trim().is_empty() {
            return Err(ToolError::InvalidParameters("prompt must not be empty".to_string()));
        }
        if self.take_failure() {
            log::warn!("[TOOLS] Image backend unavailable for call {}", context.call_id);
            return Err(ToolError::Remote("image backend unavailable".to_string()));
        }

        let now = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        let filename = format!(
            "{}{}_{}.png",
            IMAGE_PREFIX,
            now.format("%Y%m%d_%H%M%S"),
            &suffix[..8]
        );

        let mut entry = Map::new();
        entry.insert(
            filename.clone(),
            json!({
                "prompt": params.prompt,
                "mime_type": "image/png",
                "created_at": now.to_rfc3339(),
            }),
        );
        let index = context.state.merge(Scope::Session, IMAGE_INDEX_KEY, entry)?;
        context.state.set(Scope::Session, LAST_IMAGE_KEY, filename.as_str())?;

        let total = index.as_object().map(Map::len).unwrap_or_default();
        log::info!("[TOOLS] Generated {} ({} image(s) in session)", filename, total);
        Ok(Value::String(format!(
            "🎨 Image generated successfully!\nFile: {}\nPrompt: {}",
            filename, params.prompt
        )))
    }
}

/// Lists the session's generated images, newest first
pub struct ListGeneratedImagesTool;

#[async_trait]
impl Tool for ListGeneratedImagesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("list_generated_images", "List the images generated in this session")
    }

    async fn execute(&self, _params: Value, context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let index = context.state.get(Scope::Session, IMAGE_INDEX_KEY)?;
        let images = index.as_ref().and_then(Value::as_object);
        let Some(images) = images.filter(|m| !m.is_empty()) else {
            return Ok(Value::String(
                "📂 No images found in this session.\n\n💡 Tip: ask for an image to be generated first.".to_string(),
            ));
        };

        let mut names: Vec<&String> = images.keys().collect();
        names.sort_by(|a, b| b.cmp(a));

        let mut text = String::from("📂 Available images:\n\n🎨 Generated images:\n");
        for name in names {
            text.push_str(&format!("• {}\n", name));
            if let Some(prompt) = images[name.as_str()].get("prompt").and_then(Value::as_str) {
                text.push_str(&format!("  - Prompt: {}\n", prompt));
            }
        }
        Ok(Value::String(text))
    }
}
