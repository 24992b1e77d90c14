//! Tool invocation boundary
//!
//! Tools receive their JSON arguments and a `ToolContext` with the turn's state, and
//! return a JSON result. Business outcomes, failures included, are results; `ToolError`
//! is only for bad arguments and remote failures.

pub mod builtin;
pub mod registry;
pub mod types;

pub use builtin::create_default_registry;
pub use registry::{Tool, ToolRegistry};
pub use types::{parse_params, PropertySchema, ToolContext, ToolDefinition, ToolInputSchema};
