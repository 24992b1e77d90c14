//! Built-in hooks
//!
//! - Logging - records every interception point
//! - Rate limiting - turns per session and tool calls per turn
//! - Mood gate, content filter, response guard, translation quality, tool permission,
//!   calculation validator and audit - the callbacks of the preset agents
//! - Image upload and memory - artifacts in, sessions out

mod audit_hook;
mod calculation_validator;
mod content_filter;
mod image_upload;
mod logging_hook;
mod memory_hook;
mod mood_gate;
mod rate_limit_hook;
mod response_guard;
mod tool_permission;
mod translation_quality;

pub use audit_hook::{AuditHook, AUDIT_ENABLED_KEY};
pub use calculation_validator::{
    approximate_fraction, CalculationValidatorHook, ADD_EXPLANATIONS_KEY, VALIDATION_ENABLED_KEY,
};
pub use content_filter::{
    ContentFilterHook, BLOCKED_KEYWORDS, ENHANCEMENT_PREFIX, FILTER_ENABLED_KEY, SAFETY_NOTICES,
};
pub use image_upload::ImageUploadHook;
pub use logging_hook::{LogLevel, LoggingHook};
pub use memory_hook::MemoryHook;
pub use mood_gate::{MoodGateHook, DEFAULT_MOOD, GRUMPY_RESPONSES, MOOD_KEY};
pub use rate_limit_hook::{RateLimitConfig, RateLimitHook};
pub use response_guard::{ResponseGuardHook, DEFAULT_MARKER, SAFETY_MESSAGE};
pub use tool_permission::{
    ToolPermissionHook, DEFAULT_ROLE, RATE_LIMITED_KEY, TOOLS_ENABLED_KEY, USER_ROLE_KEY,
};
pub use translation_quality::{
    improvements_needed, TranslationQualityHook, ENHANCE_KEY, POST_PROCESS_KEY,
};
