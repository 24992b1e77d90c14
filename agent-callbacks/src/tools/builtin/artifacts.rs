//! Session artifacts
//!
//! Uploaded files live in the session's `artifacts` index, keyed by file name. Saving
//! under an existing name adds a version instead of overwriting; readers get the latest.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{StateError, ToolError};
use crate::state::{Scope, TurnState};
use crate::tools::registry::Tool;
use crate::tools::types::{parse_params, PropertySchema, ToolContext, ToolDefinition};

pub const ARTIFACTS_KEY: &str = "artifacts";
pub const LAST_UPLOAD_KEY: &str = "last_uploaded_image";
pub const UPLOAD_PREFIX: &str = "uploaded_image_";

const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Save `data` (base64) as a new version of `filename`. Returns the version number,
/// starting at 0.
pub fn save_artifact(
    state: &TurnState,
    filename: &str,
    mime_type: &str,
    data: &str,
    size: usize,
) -> Result<u64, StateError> {
    let index = state.get(Scope::Session, ARTIFACTS_KEY)?;
    let mut versions = index
        .as_ref()
        .and_then(|i| i.get(filename))
        .and_then(|a| a.get("versions"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let version = versions.len() as u64;
    versions.push(json!({
        "version": version,
        "mime_type": mime_type,
        "size": size,
        "data": data,
        "saved_at": Utc::now().to_rfc3339(),
    }));

    let mut entry = Map::new();
    entry.insert(filename.to_string(), json!({ "versions": versions }));
    state.merge(Scope::Session, ARTIFACTS_KEY, entry)?;
    Ok(version)
}

fn latest_version<'a>(index: &'a Map<String, Value>, filename: &str) -> Option<&'a Value> {
    index
        .get(filename)
        .and_then(|a| a.get("versions"))
        .and_then(Value::as_array)
        .and_then(|v| v.last())
}

fn artifact_index(state: &TurnState) -> Result<Map<String, Value>, StateError> {
    Ok(state
        .get(Scope::Session, ARTIFACTS_KEY)?
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default())
}

fn is_uploaded_image(name: &str) -> bool {
    name.starts_with(UPLOAD_PREFIX) && IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Lists the artifacts saved in this session
pub struct ListArtifactsTool;

#[async_trait]
impl Tool for ListArtifactsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("list_artifacts", "List the artifacts saved in the current session")
    }

    async fn execute(&self, _params: Value, context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let index = artifact_index(context.state)?;
        if index.is_empty() {
            return Ok(Value::String("📂 No artifacts found in this session.".to_string()));
        }

        let mut text = String::from("📂 Available artifacts:\n\n");
        for name in index.keys() {
            text.push_str(&format!("• {}\n", name));
            if let Some(latest) = latest_version(&index, name) {
                let versions = index[name.as_str()]["versions"].as_array().map(Vec::len).unwrap_or(1);
                text.push_str(&format!(
                    "  - Type: {}\n  - Size: {} bytes\n  - Versions: {}\n",
                    latest["mime_type"].as_str().unwrap_or("unknown"),
                    latest["size"],
                    versions
                ));
            }
        }
        Ok(Value::String(text))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ShowImageParams {
    filename: Option<String>,
}

/// Loads an image artifact for display: the named file, else the last upload, else the
/// newest uploaded image
pub struct ShowImageTool;

#[async_trait]
impl Tool for ShowImageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("show_image", "Show a saved image artifact back to the user").param(
            "filename",
            PropertySchema::string("Artifact to show; defaults to the most recent upload"),
            false,
        )
    }

    async fn execute(&self, params: Value, context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: ShowImageParams = parse_params(params)?;
        let state = context.state;
        let index = artifact_index(state)?;

        let target = match params.filename.filter(|f| !f.trim().is_empty()) {
            Some(name) => Some(name),
            None => state.text(LAST_UPLOAD_KEY)?.or_else(|| {
                index
                    .keys()
                    .filter(|name| is_uploaded_image(name))
                    .max()
                    .cloned()
            }),
        };
        let Some(target) = target else {
            return Ok(Value::String(
                "📂 No images found in the artifacts. Please upload an image first.".to_string(),
            ));
        };

        let Some(latest) = latest_version(&index, &target) else {
            log::warn!("[TOOLS] Artifact {} not found", target);
            return Ok(Value::String(format!(
                "❌ Could not load image '{}'. Check that the file exists in the artifacts.",
                target
            )));
        };

        log::info!("[TOOLS] Loaded artifact {} for display", target);
        Ok(Value::String(format!(
            "🖼️ Image loaded: {}\n\n📋 Details:\n• Type: {}\n• Size: {} bytes\n• Version: {}\n\n✅ The image is ready to be displayed.",
            target,
            latest["mime_type"].as_str().unwrap_or("unknown"),
            latest["size"],
            latest["version"]
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateStore;
    use std::sync::Arc;

    fn session() -> Arc<StateStore> {
        let store = Arc::new(StateStore::new("image_analyzer"));
        store.create_session("ana", "s1", Map::new()).unwrap();
        store
    }

    #[tokio::test]
    async fn test_saving_twice_adds_a_version() {
        let store = session();
        let state = TurnState::new(store.clone(), "ana", "s1", "inv-1");
        assert_eq!(save_artifact(&state, "notes.png", "image/png", "AAAA", 3).unwrap(), 0);
        assert_eq!(save_artifact(&state, "notes.png", "image/png", "AAAAAA==", 4).unwrap(), 1);
        save_artifact(&state, "other.gif", "image/gif", "R0lG", 3).unwrap();

        let context = ToolContext::new("call_1", &state);
        let listing = ListArtifactsTool.execute(json!({}), &context).await.unwrap();
        let listing = listing.as_str().unwrap();
        assert!(listing.contains("• notes.png\n  - Type: image/png\n  - Size: 4 bytes\n  - Versions: 2\n"));
        assert!(listing.contains("• other.gif\n"));
    }

    #[tokio::test]
    async fn test_show_image_picks_a_target() {
        let store = session();
        let state = TurnState::new(store.clone(), "ana", "s1", "inv-1");
        let context = ToolContext::new("call_1", &state);

        let empty = ShowImageTool.execute(json!({}), &context).await.unwrap();
        assert!(empty.as_str().unwrap().starts_with("📂 No images found"));
        let empty = ListArtifactsTool.execute(json!({}), &context).await.unwrap();
        assert_eq!(empty, "📂 No artifacts found in this session.");

        save_artifact(&state, "uploaded_image_20240101_100000_000.png", "image/png", "AAAA", 3).unwrap();
        save_artifact(&state, "uploaded_image_20240102_100000_000.jpg", "image/jpeg", "AAAA", 3).unwrap();
        save_artifact(&state, "report.pdf", "application/pdf", "AAAA", 3).unwrap();

        let newest = ShowImageTool.execute(json!({}), &context).await.unwrap();
        assert!(newest.as_str().unwrap().contains("Image loaded: uploaded_image_20240102_100000_000.jpg"));

        state.set(Scope::Session, LAST_UPLOAD_KEY, "uploaded_image_20240101_100000_000.png").unwrap();
        let last = ShowImageTool.execute(json!({}), &context).await.unwrap();
        assert!(last.as_str().unwrap().contains("• Type: image/png"));

        let missing = ShowImageTool
            .execute(json!({"filename": "nope.png"}), &context)
            .await
            .unwrap();
        assert!(missing.as_str().unwrap().starts_with("❌ Could not load image 'nope.png'"));
    }
}
