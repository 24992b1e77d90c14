//! Execution support for the turn pipeline
//!
//! Provides session lane serialization so concurrent turns for one session never
//! interleave.

mod session_lanes;

pub use session_lanes::{SessionLaneGuard, SessionLaneManager, SessionLaneStats, LANE_IDLE_TIMEOUT};
