//! Model invocation boundary
//!
//! The pipeline only ever talks to a model through `ModelClient`. Real inference is out
//! of scope; `MockModelClient` replays canned responses for tests and `ScriptedModel`
//! gives the preset agents deterministic keyword-driven behaviour.

pub mod mock;
pub mod retry;
pub mod scripted;
pub mod types;

use async_trait::async_trait;

use crate::error::ModelError;

pub use mock::MockModelClient;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use scripted::{ScriptRule, ScriptedModel};
pub use types::{
    GenerationConfig, HarmCategory, Message, MessageRole, ModelRequest, ModelResponse,
    SafetySetting, SafetyThreshold, ToolCall, ToolHistoryEntry, ToolResponse,
};

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Identifier used in logs
    fn name(&self) -> &str;

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError>;
}
