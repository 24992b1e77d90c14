//! Session lane serialization
//!
//! Turns that arrive for the same session concurrently are queued on a one-permit
//! semaphore, so session state and history only ever see one writer at a time:
//! - Turns of one session run strictly one after another
//! - Tool calls of two turns never interleave within a session
//! - Turns of different sessions do not wait on each other

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Holding a lane longer than this is logged
const LANE_HOLD_WARNING_SECS: u64 = 60;

/// Lanes tracked before the oldest idle ones are pruned
const MAX_SESSION_LANES: usize = 10000;

/// Default idle time after which a lane can be pruned
pub const LANE_IDLE_TIMEOUT: Duration = Duration::from_secs(3600);

struct LaneMetadata {
    last_used: Instant,
    turns: u64,
}

/// Guard that releases the session lane when dropped
pub struct SessionLaneGuard {
    session_id: String,
    _permit: OwnedSemaphorePermit,
    acquired_at: Instant,
    manager: Arc<SessionLaneManager>,
}

impl SessionLaneGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn held_duration(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl Drop for SessionLaneGuard {
    fn drop(&mut self) {
        let held = self.acquired_at.elapsed();
        if held.as_secs() > LANE_HOLD_WARNING_SECS {
            log::warn!(
                "[LANES] Session {} lane held for {} seconds",
                self.session_id,
                held.as_secs()
            );
        }

        if let Some(mut entry) = self.manager.metadata.get_mut(&self.session_id) {
            entry.last_used = Instant::now();
        }
    }
}

/// One lane per session id
#[derive(Default)]
pub struct SessionLaneManager {
    lanes: DashMap<String, Arc<Semaphore>>,
    metadata: DashMap<String, LaneMetadata>,
}

impl SessionLaneManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait for exclusive access to `session_id`.
    ///
    /// The lane is released when the returned guard is dropped.
    pub async fn acquire(self: &Arc<Self>, session_id: &str) -> SessionLaneGuard {
        self.prune_if_over_limit();
        let semaphore = self.get_or_create_lane(session_id);
        let permit = semaphore
            .acquire_owned()
            .await
            .expect("session lane semaphores are never closed");
        self.guard(session_id, permit)
    }

    /// Take the lane only if nobody holds it
    pub fn try_acquire(self: &Arc<Self>, session_id: &str) -> Option<SessionLaneGuard> {
        self.prune_if_over_limit();
        let semaphore = self.get_or_create_lane(session_id);
        let permit = semaphore.try_acquire_owned().ok()?;
        Some(self.guard(session_id, permit))
    }

    fn guard(self: &Arc<Self>, session_id: &str, permit: OwnedSemaphorePermit) -> SessionLaneGuard {
        self.metadata
            .entry(session_id.to_string())
            .and_modify(|m| {
                m.last_used = Instant::now();
                m.turns += 1;
            })
            .or_insert_with(|| LaneMetadata {
                last_used: Instant::now(),
                turns: 1,
            });

        SessionLaneGuard {
            session_id: session_id.to_string(),
            _permit: permit,
            acquired_at: Instant::now(),
            manager: Arc::clone(self),
        }
    }

    pub fn is_session_busy(&self, session_id: &str) -> bool {
        self.lanes
            .get(session_id)
            .map(|s| s.available_permits() == 0)
            .unwrap_or(false)
    }

    pub fn stats(&self) -> SessionLaneStats {
        let total_turns = self.metadata.iter().map(|e| e.turns).sum();
        let active_lanes = self
            .lanes
            .iter()
            .filter(|e| e.available_permits() == 0)
            .count();

        SessionLaneStats {
            total_lanes: self.lanes.len(),
            active_lanes,
            total_turns,
        }
    }

    /// Forget the lane of a session that is gone. A lane still held is kept.
    pub fn remove_lane(&self, session_id: &str) -> bool {
        let removed = self
            .lanes
            .remove_if(session_id, |_, lane| lane.available_permits() > 0)
            .is_some();
        if removed {
            self.metadata.remove(session_id);
            log::debug!("[LANES] Removed lane for session {}", session_id);
        }
        removed
    }

    fn prune_if_over_limit(&self) {
        if self.lanes.len() > MAX_SESSION_LANES {
            self.prune_idle_lanes(LANE_IDLE_TIMEOUT);
        }
    }

    /// Drop lanes idle for longer than `idle_timeout`, and the oldest idle lanes once
    /// more than the tracking limit exist. Lanes in use are never removed.
    /// Returns the number of lanes removed.
    pub fn prune_idle_lanes(&self, idle_timeout: Duration) -> usize {
        let now = Instant::now();
        let is_free = |key: &str| {
            self.lanes
                .get(key)
                .map(|lane| lane.available_permits() > 0)
                .unwrap_or(false)
        };

        let mut to_remove: Vec<String> = self
            .metadata
            .iter()
            .filter(|e| now.duration_since(e.last_used) > idle_timeout)
            .map(|e| e.key().clone())
            .filter(|key| is_free(key))
            .collect();

        if self.lanes.len() > MAX_SESSION_LANES {
            let mut by_age: Vec<(String, Instant)> = self
                .metadata
                .iter()
                .map(|e| (e.key().clone(), e.last_used))
                .collect();
            by_age.sort_by(|a, b| a.1.cmp(&b.1));

            let excess = self.lanes.len() - MAX_SESSION_LANES;
            for (key, _) in by_age.into_iter().take(excess) {
                if !to_remove.contains(&key) && is_free(&key) {
                    to_remove.push(key);
                }
            }
        }

        for key in &to_remove {
            self.lanes.remove(key);
            self.metadata.remove(key);
        }
        if !to_remove.is_empty() {
            log::debug!("[LANES] Pruned {} idle session lane(s)", to_remove.len());
        }
        to_remove.len()
    }

    fn get_or_create_lane(&self, session_id: &str) -> Arc<Semaphore> {
        self.lanes
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }
}

/// Statistics about session lanes
#[derive(Debug, Clone)]
pub struct SessionLaneStats {
    pub total_lanes: usize,
    /// Lanes currently held by a turn
    pub active_lanes: usize,
    pub total_turns: u64,
}
