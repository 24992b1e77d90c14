//! Scoped state
//!
//! Four namespaces selected by key prefix:
//! - `temp:` lives for one turn and is never persisted
//! - no prefix lives as long as the session
//! - `user:` is shared by every session of one user id
//! - `app:` is shared by all users
//!
//! Hooks and tools use `TurnState`; callers outside a turn use `StateStore` directly.

pub mod scope;
pub mod store;
pub mod turn_state;

pub use scope::{Scope, StateKey};
pub use store::{SessionInfo, StateStore};
pub use turn_state::TurnState;
