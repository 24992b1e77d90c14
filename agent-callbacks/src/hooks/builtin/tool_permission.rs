//! Tool permission hook - role checks and argument policing before a tool runs
//!
//! Checks run in this order, the first refusal wins:
//! 1. `tools_enabled` (session, default true) gates every tool
//! 2. the role matrix: `user_role` (session, default `basic`) must be listed for the tool
//! 3. `rate_limit_exceeded` (session, default false)
//! 4. premium forecasts for restricted locations
//! 5. a location containing "block" gets a substitute blocked result
//! 6. basic users get at most 3 forecast days (the arguments are rewritten)

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::hooks::types::{Hook, HookOutcome, HookResult, InterceptionPoint};
use crate::pipeline::TurnEnvelope;
use crate::state::TurnState;

pub const TOOLS_ENABLED_KEY: &str = "tools_enabled";
pub const USER_ROLE_KEY: &str = "user_role";
pub const RATE_LIMITED_KEY: &str = "rate_limit_exceeded";
pub const DEFAULT_ROLE: &str = "basic";

const FORECAST_TOOL: &str = "get_weather_forecast";
const RESTRICTED_LOCATIONS: [&str; 3] = ["classified", "secret", "restricted"];
const BASIC_MAX_FORECAST_DAYS: u64 = 3;

pub struct ToolPermissionHook {
    /// Tool name to the roles allowed to call it; unlisted tools are open to everyone
    permissions: HashMap<String, Vec<String>>,
}

impl ToolPermissionHook {
    /// Permissions of the weather service
    pub fn new() -> Self {
        Self::with_permissions([
            ("get_current_weather", &["basic", "premium", "admin"][..]),
            ("get_weather_forecast", &["premium", "admin"][..]),
            ("get_weather_alerts", &["basic", "premium", "admin"][..]),
        ])
    }

    pub fn with_permissions<'a>(matrix: impl IntoIterator<Item = (&'a str, &'a [&'a str])>) -> Self {
        ToolPermissionHook {
            permissions: matrix
                .into_iter()
                .map(|(tool, roles)| (tool.to_string(), roles.iter().map(|r| r.to_string()).collect()))
                .collect(),
        }
    }

    fn check_role(&self, tool_name: &str, role: &str) -> Option<String> {
        let allowed = self.permissions.get(tool_name)?;
        if allowed.iter().any(|r| r == role) {
            return None;
        }
        Some(format!(
            "🚫 Access denied. Tool '{}' requires {} access. Your role: {}",
            tool_name,
            allowed.join("/"),
            role
        ))
    }
}

impl Default for ToolPermissionHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hook for ToolPermissionHook {
    fn id(&self) -> &str {
        "builtin.tool_permission"
    }

    fn name(&self) -> &str {
        "Tool Permission"
    }

    fn description(&self) -> &str {
        "Checks roles, limits and restricted arguments before tools run"
    }

    fn points(&self) -> Vec<InterceptionPoint> {
        vec![InterceptionPoint::PreTool]
    }

    async fn before_tool(&self, envelope: &TurnEnvelope, state: &TurnState) -> HookOutcome {
        let Some(call) = &envelope.tool_call else {
            return Ok(HookResult::Continue);
        };
        let tool_name = call.name.as_str();

        if !state.flag(TOOLS_ENABLED_KEY, true)? {
            log::info!("[PERMISSION] Tools disabled for session {}", state.session_id());
            return Ok(HookResult::deny_tool(
                "🚫 Weather tools are currently disabled for this session.",
            ));
        }

        let role = state
            .text(USER_ROLE_KEY)?
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());
        if let Some(reason) = self.check_role(tool_name, &role) {
            log::info!("[PERMISSION] {} denied for role {}", tool_name, role);
            return Ok(HookResult::deny_tool(reason));
        }

        if state.flag(RATE_LIMITED_KEY, false)? {
            return Ok(HookResult::deny_tool(
                "⏰ Rate limit exceeded. Please wait before making more weather requests.",
            ));
        }

        let location = envelope.tool_arg_str("location").unwrap_or_default().to_lowercase();

        if tool_name == FORECAST_TOOL
            && role == "premium"
            && RESTRICTED_LOCATIONS.iter().any(|r| location.contains(r))
        {
            return Ok(HookResult::deny_tool("🚫 Weather data for this location is restricted."));
        }

        if location.contains("block") {
            log::info!("[PERMISSION] Location '{}' is blocked", location);
            return Ok(HookResult::tool_result(json!({
                "result": "🚫 This location is blocked by the weather service administrator.",
                "blocked": true,
            })));
        }

        if tool_name == FORECAST_TOOL && role == DEFAULT_ROLE {
            let days = call.arguments.get("days").and_then(Value::as_u64);
            if days.is_some_and(|d| d > BASIC_MAX_FORECAST_DAYS) {
                log::info!("[PERMISSION] Capping forecast days at {} for basic role", BASIC_MAX_FORECAST_DAYS);
                let mut capped = envelope.clone();
                if let Some(call) = capped.tool_call.as_mut() {
                    call.arguments["days"] = json!(BASIC_MAX_FORECAST_DAYS);
                }
                return Ok(HookResult::mutate(capped));
            }
        }

        Ok(HookResult::Continue)
    }
}
