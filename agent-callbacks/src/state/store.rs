//! In-memory backing store for session, user and app state.
//!
//! Temp state never reaches this store; it lives in the per-turn `TurnState`. Each
//! read-modify-write goes through a single map guard, so `increment` and `merge` are
//! atomic per key even when turns of different sessions run concurrently.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};

use super::scope::{Scope, StateKey};
use crate::error::StateError;
use crate::model::Message;

/// Public view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub turns: u64,
}

struct SessionRecord {
    user_id: String,
    created_at: DateTime<Utc>,
    state: HashMap<String, Value>,
    history: Vec<Message>,
    turns: u64,
}

/// Which persistent map an operation targets
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot<'a> {
    App,
    User(&'a str),
    Session(&'a str),
}

impl<'a> Slot<'a> {
    /// `None` for temp, which has no persistent slot
    pub(crate) fn resolve(scope: Scope, user_id: &'a str, session_id: &'a str) -> Option<Self> {
        match scope {
            Scope::Temp => None,
            Scope::Session => Some(Slot::Session(session_id)),
            Scope::User => Some(Slot::User(user_id)),
            Scope::App => Some(Slot::App),
        }
    }
}

pub struct StateStore {
    app_name: String,
    app: RwLock<HashMap<String, Value>>,
    users: DashMap<String, HashMap<String, Value>>,
    sessions: DashMap<String, SessionRecord>,
}

impl StateStore {
    pub fn new(app_name: impl Into<String>) -> Self {
        StateStore {
            app_name: app_name.into(),
            app: RwLock::new(HashMap::new()),
            users: DashMap::new(),
            sessions: DashMap::new(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    // ==================== Sessions ====================

    /// Create a session seeded with `initial` state. Keys resolve like any other state
    /// key: `user:`/`app:` entries land in their namespaces, `temp:` keys are refused.
    pub fn create_session(
        &self,
        user_id: &str,
        session_id: &str,
        initial: Map<String, Value>,
    ) -> Result<SessionInfo, StateError> {
        let now = Utc::now();
        let mut session_state = HashMap::new();
        let mut user_state = Vec::new();
        let mut app_state = Vec::new();
        for (key, value) in initial {
            let parsed = StateKey::parse(&key)?;
            match parsed.scope {
                Scope::Temp => return Err(StateError::TempNotPersistable(key)),
                Scope::Session => {
                    session_state.insert(parsed.name, value);
                }
                Scope::User => user_state.push((parsed.name, value)),
                Scope::App => app_state.push((parsed.name, value)),
            }
        }

        match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(_) => {
                return Err(StateError::SessionExists(session_id.to_string()));
            }
            Entry::Vacant(entry) => {
                entry.insert(SessionRecord {
                    user_id: user_id.to_string(),
                    created_at: now,
                    state: session_state,
                    history: Vec::new(),
                    turns: 0,
                });
            }
        }

        if !user_state.is_empty() {
            let mut user = self.users.entry(user_id.to_string()).or_default();
            user.extend(user_state);
        }
        if !app_state.is_empty() {
            self.app.write().extend(app_state);
        }

        log::info!(
            "[STATE] Created session {} for user {} in app {}",
            session_id,
            user_id,
            self.app_name
        );

        Ok(SessionInfo {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            turns: 0,
        })
    }

    pub fn session(&self, session_id: &str) -> Option<SessionInfo> {
        self.sessions.get(session_id).map(|record| SessionInfo {
            session_id: session_id.to_string(),
            user_id: record.user_id.clone(),
            created_at: record.created_at,
            turns: record.turns,
        })
    }

    /// Check that `session_id` exists and belongs to `user_id`
    pub fn verify_owner(&self, user_id: &str, session_id: &str) -> Result<(), StateError> {
        let record = self
            .sessions
            .get(session_id)
            .ok_or_else(|| StateError::SessionNotFound(session_id.to_string()))?;
        if record.user_id != user_id {
            return Err(StateError::SessionOwnerMismatch {
                session_id: session_id.to_string(),
                user_id: user_id.to_string(),
            });
        }
        Ok(())
    }

    /// End a session, discarding its namespace and history. User and app state survive.
    pub fn end_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            log::info!("[STATE] Ended session {}", session_id);
        }
        removed
    }

    pub fn history(&self, session_id: &str) -> Result<Vec<Message>, StateError> {
        self.sessions
            .get(session_id)
            .map(|record| record.history.clone())
            .ok_or_else(|| StateError::SessionNotFound(session_id.to_string()))
    }

    pub(crate) fn record_turn(
        &self,
        session_id: &str,
        messages: impl IntoIterator<Item = Message>,
    ) -> Result<(), StateError> {
        let mut record = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| StateError::SessionNotFound(session_id.to_string()))?;
        record.history.extend(messages);
        record.turns += 1;
        Ok(())
    }

    // ==================== Key access ====================

    /// Read a prefixed key as seen from `session_id`. Temp keys are never stored here and
    /// always read as absent.
    pub fn get(&self, session_id: &str, key: &str) -> Result<Option<Value>, StateError> {
        let key = StateKey::parse(key)?;
        let owner = self.owner_of(session_id)?;
        match Slot::resolve(key.scope, &owner, session_id) {
            Some(slot) => self.read_slot(slot, &key.name),
            None => Ok(None),
        }
    }

    /// Write a prefixed key as seen from `session_id`
    pub fn set(&self, session_id: &str, key: &str, value: Value) -> Result<(), StateError> {
        let parsed = StateKey::parse(key)?;
        let owner = self.owner_of(session_id)?;
        let slot = Slot::resolve(parsed.scope, &owner, session_id)
            .ok_or_else(|| StateError::TempNotPersistable(key.to_string()))?;
        self.with_slot(slot, |map| {
            map.insert(parsed.name, value);
        })
    }

    /// Direct read of the user namespace
    pub fn user_value(&self, user_id: &str, name: &str) -> Option<Value> {
        self.users.get(user_id).and_then(|m| m.get(name).cloned())
    }

    /// Direct read of the app namespace
    pub fn app_value(&self, name: &str) -> Option<Value> {
        self.app.read().get(name).cloned()
    }

    /// Everything visible from a session, keys carrying their scope prefix
    pub fn export_session(&self, session_id: &str) -> Result<Map<String, Value>, StateError> {
        let record = self
            .sessions
            .get(session_id)
            .ok_or_else(|| StateError::SessionNotFound(session_id.to_string()))?;

        let mut out = Map::new();
        for (name, value) in &record.state {
            out.insert(name.clone(), value.clone());
        }
        if let Some(user) = self.users.get(&record.user_id) {
            for (name, value) in user.iter() {
                out.insert(format!("user:{}", name), value.clone());
            }
        }
        for (name, value) in self.app.read().iter() {
            out.insert(format!("app:{}", name), value.clone());
        }
        Ok(out)
    }

    // ==================== Slot plumbing ====================

    fn owner_of(&self, session_id: &str) -> Result<String, StateError> {
        self.sessions
            .get(session_id)
            .map(|r| r.user_id.clone())
            .ok_or_else(|| StateError::SessionNotFound(session_id.to_string()))
    }

    pub(crate) fn read_slot(&self, slot: Slot<'_>, name: &str) -> Result<Option<Value>, StateError> {
        match slot {
            Slot::App => Ok(self.app.read().get(name).cloned()),
            Slot::User(user_id) => Ok(self.user_value(user_id, name)),
            Slot::Session(session_id) => self
                .sessions
                .get(session_id)
                .map(|r| r.state.get(name).cloned())
                .ok_or_else(|| StateError::SessionNotFound(session_id.to_string())),
        }
    }

    /// Run `f` against the slot's map while holding its write guard
    pub(crate) fn with_slot<R>(
        &self,
        slot: Slot<'_>,
        f: impl FnOnce(&mut HashMap<String, Value>) -> R,
    ) -> Result<R, StateError> {
        match slot {
            Slot::App => Ok(f(&mut *self.app.write())),
            Slot::User(user_id) => {
                let mut user = self.users.entry(user_id.to_string()).or_default();
                Ok(f(&mut *user))
            }
            Slot::Session(session_id) => {
                let mut record = self
                    .sessions
                    .get_mut(session_id)
                    .ok_or_else(|| StateError::SessionNotFound(session_id.to_string()))?;
                Ok(f(&mut record.state))
            }
        }
    }
}
