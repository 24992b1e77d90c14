//! Long-term conversation memory
//!
//! Finished sessions are copied into a per-user memory so later sessions can search
//! what was said before. Storing a session again replaces its earlier copy. Search is a
//! keyword match: an entry is returned when it shares at least one word with the query.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{Message, MessageRole};

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// One remembered message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub session_id: String,
    pub author: MessageRole,
    pub text: String,
    pub saved_at: DateTime<Utc>,
}

/// Memory scope: one application, one user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoryOwner {
    app_name: String,
    user_id: String,
}

impl MemoryOwner {
    fn new(app_name: &str, user_id: &str) -> Self {
        MemoryOwner {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
        }
    }
}

/// In-memory store of past sessions
#[derive(Default)]
pub struct MemoryService {
    sessions: DashMap<MemoryOwner, BTreeMap<String, Vec<MemoryEntry>>>,
}

fn words(text: &str) -> HashSet<String> {
    WORD.find_iter(text).map(|m| m.as_str().to_lowercase()).collect()
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the messages of `session_id`, replacing what was stored for it before.
    /// Empty messages are skipped. Returns the number of entries kept.
    pub fn add_session(&self, app_name: &str, user_id: &str, session_id: &str, messages: &[Message]) -> usize {
        let now = Utc::now();
        let entries: Vec<MemoryEntry> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System && !m.content.trim().is_empty())
            .map(|m| MemoryEntry {
                session_id: session_id.to_string(),
                author: m.role,
                text: m.content.clone(),
                saved_at: now,
            })
            .collect();
        let count = entries.len();

        self.sessions
            .entry(MemoryOwner::new(app_name, user_id))
            .or_default()
            .insert(session_id.to_string(), entries);
        log::debug!(
            "[MEMORY] Stored {} entr{} of session {} for {}/{}",
            count,
            if count == 1 { "y" } else { "ies" },
            session_id,
            app_name,
            user_id
        );
        count
    }

    /// Entries of the user's sessions sharing a word with `query`, oldest session first
    pub fn search(&self, app_name: &str, user_id: &str, query: &str, limit: usize) -> Vec<MemoryEntry> {
        let wanted = words(query);
        if wanted.is_empty() {
            return Vec::new();
        }
        let Some(sessions) = self.sessions.get(&MemoryOwner::new(app_name, user_id)) else {
            return Vec::new();
        };

        let mut found: Vec<MemoryEntry> = sessions
            .values()
            .flatten()
            .filter(|entry| !words(&entry.text).is_disjoint(&wanted))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.saved_at.cmp(&b.saved_at));
        found.truncate(limit);
        found
    }

    pub fn session_count(&self, app_name: &str, user_id: &str) -> usize {
        self.sessions
            .get(&MemoryOwner::new(app_name, user_id))
            .map(|s| s.len())
            .unwrap_or_default()
    }

    pub fn forget_user(&self, app_name: &str, user_id: &str) -> bool {
        self.sessions.remove(&MemoryOwner::new(app_name, user_id)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(user: &str, assistant: &str) -> Vec<Message> {
        vec![Message::user(user), Message::assistant(assistant)]
    }

    #[test]
    fn test_search_matches_any_word() {
        let memory = MemoryService::new();
        memory.add_session(
            "essencia",
            "maria",
            "s1",
            &conversation("I love the lavender soap", "Noted, lavender it is!"),
        );
        memory.add_session("essencia", "maria", "s2", &conversation("Do you ship to Recife?", "Yes."));

        let found = memory.search("essencia", "maria", "LAVENDER please", 10);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.session_id == "s1"));
        assert_eq!(found[0].author, MessageRole::User);

        assert!(memory.search("essencia", "maria", "perfume", 10).is_empty());
        assert!(memory.search("essencia", "maria", "  ?! ", 10).is_empty());
        assert_eq!(memory.search("essencia", "maria", "lavender recife", 1).len(), 1);
    }

    #[test]
    fn test_memory_is_scoped_per_user_and_app() {
        let memory = MemoryService::new();
        memory.add_session("essencia", "maria", "s1", &conversation("lavender", "ok"));

        assert!(memory.search("essencia", "joao", "lavender", 10).is_empty());
        assert!(memory.search("other_app", "maria", "lavender", 10).is_empty());
        assert!(memory.forget_user("essencia", "maria"));
        assert_eq!(memory.session_count("essencia", "maria"), 0);
    }

    #[test]
    fn test_storing_a_session_again_replaces_it() {
        let memory = MemoryService::new();
        let mut messages = conversation("hello", "hi");
        assert_eq!(memory.add_session("app", "u1", "s1", &messages), 2);
        messages.extend(conversation("tell me about roses", ""));
        assert_eq!(memory.add_session("app", "u1", "s1", &messages), 3);

        assert_eq!(memory.session_count("app", "u1"), 1);
        assert_eq!(memory.search("app", "u1", "hello roses", 10).len(), 2);
    }
}
