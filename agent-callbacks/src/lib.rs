//! Callback interception for conversational agents
//!
//! A `TurnPipeline` runs one user turn through six interception points where hooks can
//! observe, mutate or short-circuit the turn. Hooks and tools share scoped state
//! (`temp:`, session, `user:` and `app:`) held by a `StateStore`.

pub mod agents;
pub mod audit;
pub mod config;
pub mod error;
pub mod execution;
pub mod hooks;
pub mod memory;
pub mod model;
pub mod pipeline;
pub mod state;
pub mod tools;

pub use agents::AgentKind;
pub use config::PipelineConfig;
pub use error::{PipelineError, StateError};
pub use hooks::{Hook, HookResult, InterceptionPoint};
pub use pipeline::{TurnOutcome, TurnPipeline};
pub use state::{Scope, StateStore, TurnState};
