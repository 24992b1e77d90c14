//! Hook system for the turn interception points
//!
//! A hook attaches to one or more of the six interception points of a turn and can:
//!
//! - Let the turn proceed (`Continue`)
//! - Proceed with a modified envelope (`ContinueWith`)
//! - Supply a substitute response or tool result and skip the stage (`ShortCircuit`)
//!
//! Each point holds at most one hook; registering again replaces it.
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_callbacks::hooks::{HookRegistry, InterceptionPoint};
//! use agent_callbacks::hooks::builtin::ResponseGuardHook;
//!
//! let registry = HookRegistry::new();
//! registry.register(Arc::new(ResponseGuardHook::new()));
//!
//! let result = registry
//!     .dispatch(InterceptionPoint::PostModel, &envelope, &state)
//!     .await?;
//! if result.is_short_circuit() {
//!     // The guard replaced the response
//! }
//! ```

pub mod builtin;
mod registry;
mod types;

pub use registry::HookRegistry;
pub use types::{
    BoxedHook, FnHook, Hook, HookConfig, HookOutcome, HookResult, HookStats, InterceptionPoint,
    Payload,
};
