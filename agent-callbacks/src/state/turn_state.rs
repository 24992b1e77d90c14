use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::scope::{Scope, StateKey};
use super::store::{Slot, StateStore};
use crate::error::StateError;
use crate::model::Message;

/// State handle for one turn.
///
/// Hooks and tools reach every namespace through this handle. Session, user and app
/// reads and writes go straight to the shared `StateStore`; temp values stay here and
/// are gone once the turn ends.
pub struct TurnState {
    store: Arc<StateStore>,
    user_id: String,
    session_id: String,
    invocation_id: String,
    temp: Mutex<HashMap<String, Value>>,
}

impl TurnState {
    pub fn new(
        store: Arc<StateStore>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        invocation_id: impl Into<String>,
    ) -> Self {
        TurnState {
            store,
            user_id: user_id.into(),
            session_id: session_id.into(),
            invocation_id: invocation_id.into(),
            temp: Mutex::new(HashMap::new()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    pub fn app_name(&self) -> &str {
        self.store.app_name()
    }

    /// Committed history of the session, without the turn in flight
    pub fn history(&self) -> Result<Vec<Message>, StateError> {
        self.store.history(&self.session_id)
    }

    // ==================== Explicit scope ====================

    pub fn get(&self, scope: Scope, name: &str) -> Result<Option<Value>, StateError> {
        self.read(&StateKey::scoped(scope, name)?)
    }

    pub fn set(&self, scope: Scope, name: &str, value: impl Into<Value>) -> Result<(), StateError> {
        self.write(StateKey::scoped(scope, name)?, value.into())
    }

    pub fn remove(&self, scope: Scope, name: &str) -> Result<Option<Value>, StateError> {
        let key = StateKey::scoped(scope, name)?;
        match self.slot(key.scope) {
            Some(slot) => self.store.with_slot(slot, |map| map.remove(&key.name)),
            None => Ok(self.temp.lock().remove(&key.name)),
        }
    }

    // ==================== Prefixed keys ====================

    /// Read a key whose scope comes from its prefix (`user:`, `app:`, `temp:` or none)
    pub fn get_key(&self, key: &str) -> Result<Option<Value>, StateError> {
        self.read(&StateKey::parse(key)?)
    }

    pub fn set_key(&self, key: &str, value: impl Into<Value>) -> Result<(), StateError> {
        self.write(StateKey::parse(key)?, value.into())
    }

    /// Boolean flag with a default for missing or non-boolean values. Accepts the strings
    /// "true" and "false" as well.
    pub fn flag(&self, key: &str, default: bool) -> Result<bool, StateError> {
        Ok(match self.get_key(key)? {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => match s.to_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => default,
            },
            _ => default,
        })
    }

    /// String value, with other scalars rendered as text
    pub fn text(&self, key: &str) -> Result<Option<String>, StateError> {
        Ok(match self.get_key(key)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
    }

    // ==================== Atomic updates ====================

    /// Add `delta` to an integer value, treating a missing value as zero. Returns the new
    /// value. Atomic per key.
    pub fn increment(&self, scope: Scope, name: &str, delta: i64) -> Result<i64, StateError> {
        let key = StateKey::scoped(scope, name)?;
        let apply = |map: &mut HashMap<String, Value>| -> Result<i64, StateError> {
            let current = match map.get(&key.name) {
                None | Some(Value::Null) => 0,
                Some(value) => value
                    .as_i64()
                    .ok_or_else(|| StateError::NotANumber(key.qualified()))?,
            };
            let next = current.saturating_add(delta);
            map.insert(key.name.clone(), Value::from(next));
            Ok(next)
        };
        match self.slot(key.scope) {
            Some(slot) => self.store.with_slot(slot, apply)?,
            None => apply(&mut *self.temp.lock()),
        }
    }

    /// Shallow-merge `patch` into an object value, creating it when missing. Returns the
    /// merged object. Atomic per key.
    pub fn merge(&self, scope: Scope, name: &str, patch: Map<String, Value>) -> Result<Value, StateError> {
        let key = StateKey::scoped(scope, name)?;
        let apply = |map: &mut HashMap<String, Value>| -> Result<Value, StateError> {
            let entry = map
                .entry(key.name.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if entry.is_null() {
                *entry = Value::Object(Map::new());
            }
            let object = entry
                .as_object_mut()
                .ok_or_else(|| StateError::NotAnObject(key.qualified()))?;
            object.extend(patch);
            Ok(entry.clone())
        };
        match self.slot(key.scope) {
            Some(slot) => self.store.with_slot(slot, apply)?,
            None => apply(&mut *self.temp.lock()),
        }
    }

    // ==================== Turn lifecycle ====================

    /// Everything this turn can see, keys carrying their prefix. Used for log output.
    pub fn snapshot(&self) -> Result<Map<String, Value>, StateError> {
        let mut out = self.store.export_session(&self.session_id)?;
        for (name, value) in self.temp.lock().iter() {
            out.insert(format!("temp:{}", name), value.clone());
        }
        Ok(out)
    }

    /// Drop all temp values, returning how many there were
    pub(crate) fn clear_temp(&self) -> usize {
        let mut temp = self.temp.lock();
        let count = temp.len();
        temp.clear();
        count
    }

    fn slot(&self, scope: Scope) -> Option<Slot<'_>> {
        Slot::resolve(scope, &self.user_id, &self.session_id)
    }

    fn read(&self, key: &StateKey) -> Result<Option<Value>, StateError> {
        match self.slot(key.scope) {
            Some(slot) => self.store.read_slot(slot, &key.name),
            None => Ok(self.temp.lock().get(&key.name).cloned()),
        }
    }

    fn write(&self, key: StateKey, value: Value) -> Result<(), StateError> {
        log::debug!("[STATE] {} <- {}", key.qualified(), value);
        match self.slot(key.scope) {
            Some(slot) => self.store.with_slot(slot, |map| {
                map.insert(key.name, value);
            }),
            None => {
                self.temp.lock().insert(key.name, value);
                Ok(())
            }
        }
    }
}
