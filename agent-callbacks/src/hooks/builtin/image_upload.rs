//! Image upload hook - Saves images sent inline with a message as session artifacts
//!
//! An image arrives as a `data:image/<type>;base64,<payload>` URI inside the user's
//! message. PreTurn decodes the first valid one, saves it as `uploaded_image_<timestamp>`
//! and records the name under `last_uploaded_image`. The model then sees a short
//! placeholder instead of the payload. Payloads that fail to decode are skipped.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::hooks::types::{Hook, HookOutcome, HookResult, InterceptionPoint};
use crate::model::MessageRole;
use crate::pipeline::TurnEnvelope;
use crate::state::{Scope, TurnState};
use crate::tools::builtin::{save_artifact, LAST_UPLOAD_KEY, UPLOAD_PREFIX};

static DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"data:(image/[A-Za-z0-9.+-]+);base64,([A-Za-z0-9+/]+={0,2})").unwrap()
});

fn extension_for(mime_type: &str) -> &str {
    match mime_type.rsplit_once('/').map(|(_, ext)| ext) {
        Some("jpeg") | None => "jpg",
        Some(ext) => ext,
    }
}

#[derive(Default)]
pub struct ImageUploadHook;

impl ImageUploadHook {
    pub fn new() -> Self {
        ImageUploadHook
    }
}

#[async_trait]
impl Hook for ImageUploadHook {
    fn id(&self) -> &str {
        "builtin.image_upload"
    }

    fn name(&self) -> &str {
        "Image Upload Hook"
    }

    fn description(&self) -> &str {
        "Saves images attached to the user's message as session artifacts"
    }

    fn points(&self) -> Vec<InterceptionPoint> {
        vec![InterceptionPoint::PreTurn]
    }

    async fn before_turn(&self, envelope: &TurnEnvelope, state: &TurnState) -> HookOutcome {
        let message = envelope.user_message();

        for captures in DATA_URI.captures_iter(message) {
            let (Some(whole), Some(mime), Some(payload)) = (captures.get(0), captures.get(1), captures.get(2))
            else {
                continue;
            };
            let bytes = match STANDARD.decode(payload.as_str()) {
                Ok(bytes) if !bytes.is_empty() => bytes,
                Ok(_) => continue,
                Err(e) => {
                    log::error!("[UPLOAD] Failed to decode {} payload: {}", mime.as_str(), e);
                    continue;
                }
            };

            let filename = format!(
                "{}{}.{}",
                UPLOAD_PREFIX,
                Utc::now().format("%Y%m%d_%H%M%S_%3f"),
                extension_for(mime.as_str())
            );
            let version = save_artifact(state, &filename, mime.as_str(), payload.as_str(), bytes.len())?;
            state.set(Scope::Session, LAST_UPLOAD_KEY, filename.as_str())?;
            log::info!(
                "[UPLOAD] Saved {} ({} bytes) as artifact '{}' version {}",
                mime.as_str(),
                bytes.len(),
                filename,
                version
            );

            let mut rewritten = envelope.clone();
            if let Some(last) = rewritten
                .request
                .messages
                .last_mut()
                .filter(|m| m.role == MessageRole::User)
            {
                last.content
                    .replace_range(whole.range(), &format!("[uploaded image: {}]", filename));
            }
            return Ok(HookResult::mutate(rewritten));
        }

        Ok(HookResult::Continue)
    }
}
