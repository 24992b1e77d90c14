//! HookRegistry - one hook per interception point
//!
//! The registry is responsible for:
//! - Attaching a hook to a point (the last registration wins)
//! - Dispatching an envelope to the hook at a point, under its timeout
//! - Tracking per-point statistics
//! - Applying per-hook configuration overrides

use super::types::{BoxedHook, Hook, HookConfig, HookOutcome, HookResult, HookStats, InterceptionPoint};
use crate::error::{HookError, PipelineError};
use crate::pipeline::TurnEnvelope;
use crate::state::TurnState;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;

pub struct HookRegistry {
    /// The hook attached at each point
    hooks: RwLock<HashMap<InterceptionPoint, BoxedHook>>,
    /// Hook configuration overrides by hook ID
    configs: DashMap<String, HookConfig>,
    /// Statistics by point
    stats: DashMap<InterceptionPoint, HookStats>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(HashMap::new()),
            configs: DashMap::new(),
            stats: DashMap::new(),
        }
    }

    /// Attach `hook` at `point`, returning the hook it replaced
    pub fn register_at(&self, point: InterceptionPoint, hook: BoxedHook) -> Option<BoxedHook> {
        log::debug!("[HOOKS] Registered hook {} at {}", hook.name(), point);
        let replaced = self.hooks.write().insert(point, hook);
        if let Some(old) = &replaced {
            log::debug!("[HOOKS] Hook {} at {} was replaced", old.id(), point);
        }
        replaced
    }

    /// Attach `hook` at every point it declares. Returns the hooks it replaced.
    pub fn register(&self, hook: BoxedHook) -> Vec<BoxedHook> {
        hook.points()
            .into_iter()
            .filter_map(|point| self.register_at(point, hook.clone()))
            .collect()
    }

    pub fn unregister(&self, point: InterceptionPoint) -> Option<BoxedHook> {
        let removed = self.hooks.write().remove(&point);
        if let Some(hook) = &removed {
            log::debug!("[HOOKS] Unregistered hook {} from {}", hook.id(), point);
        }
        removed
    }

    /// Set hook configuration
    pub fn configure(&self, config: HookConfig) {
        self.configs.insert(config.id.clone(), config);
    }

    /// Check if a hook is enabled
    fn is_enabled(&self, hook: &dyn Hook) -> bool {
        if let Some(config) = self.configs.get(hook.id()) {
            return config.enabled;
        }
        hook.enabled()
    }

    /// Get timeout for a hook
    fn get_timeout(&self, hook: &dyn Hook) -> Duration {
        if let Some(config) = self.configs.get(hook.id()) {
            if let Some(timeout_secs) = config.timeout_secs {
                return Duration::from_secs(timeout_secs);
            }
        }
        hook.timeout()
    }

    /// Run the hook attached at `point`, or `Continue` when there is none.
    ///
    /// Failures are not retried or suppressed; they come back as `PipelineError::Hook`
    /// and end the turn.
    pub async fn dispatch(
        &self,
        point: InterceptionPoint,
        envelope: &TurnEnvelope,
        state: &TurnState,
    ) -> Result<HookResult, PipelineError> {
        debug_assert_eq!(envelope.stage, point);

        let Some(hook) = self.get(point) else {
            return Ok(HookResult::Continue);
        };
        if !self.is_enabled(hook.as_ref()) {
            log::debug!("[HOOKS] Hook {} at {} is disabled", hook.id(), point);
            return Ok(HookResult::Continue);
        }

        let hook_timeout = self.get_timeout(hook.as_ref());
        let start = Instant::now();

        let outcome: HookOutcome = match timeout(hook_timeout, hook.execute(envelope, state)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                log::warn!("[HOOKS] Hook {} timed out after {:?}", hook.id(), hook_timeout);
                Err(HookError::Timeout(hook_timeout))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        self.stats
            .entry(point)
            .or_default()
            .record_execution(duration_ms, &outcome);

        match outcome {
            Ok(result) => {
                log::debug!(
                    "[HOOKS] Hook {} at {} completed in {}ms with result: {}",
                    hook.id(),
                    point,
                    duration_ms,
                    result.kind()
                );
                Ok(result)
            }
            Err(source) => {
                log::error!("[HOOKS] Hook {} failed at {}: {}", hook.id(), point, source);
                Err(PipelineError::Hook {
                    point,
                    hook_id: hook.id().to_string(),
                    source,
                })
            }
        }
    }

    pub fn get(&self, point: InterceptionPoint) -> Option<BoxedHook> {
        self.hooks.read().get(&point).cloned()
    }

    /// Points that currently have a hook attached
    pub fn points(&self) -> Vec<InterceptionPoint> {
        self.hooks.read().keys().copied().collect()
    }

    pub fn get_stats(&self, point: InterceptionPoint) -> Option<HookStats> {
        self.stats.get(&point).map(|s| s.clone())
    }

    pub fn get_all_stats(&self) -> HashMap<InterceptionPoint, HookStats> {
        self.stats
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.read().len()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
