use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::StateError;

static PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_-]*):").unwrap());

/// Lifetime and visibility of a state entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Scope {
    /// Current turn only, never persisted
    Temp,
    /// Current session, unprefixed keys
    Session,
    /// Every session of one user
    User,
    /// Every user of the application
    App,
}

impl Scope {
    /// Key prefix that selects this scope
    pub fn prefix(&self) -> &'static str {
        match self {
            Scope::Temp => "temp:",
            Scope::Session => "",
            Scope::User => "user:",
            Scope::App => "app:",
        }
    }

    pub fn is_persistent(&self) -> bool {
        !matches!(self, Scope::Temp)
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "temp" => Some(Scope::Temp),
            "user" => Some(Scope::User),
            "app" => Some(Scope::App),
            _ => None,
        }
    }
}

/// A state key resolved to its scope and bare name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub scope: Scope,
    pub name: String,
}

impl StateKey {
    /// Resolve a prefixed key. A leading `word:` segment that is not a known prefix is
    /// rejected rather than treated as part of a session key.
    pub fn parse(key: &str) -> Result<Self, StateError> {
        if key.is_empty() {
            return Err(StateError::EmptyKey);
        }

        let Some(caps) = PREFIX_PATTERN.captures(key) else {
            return Ok(StateKey {
                scope: Scope::Session,
                name: key.to_string(),
            });
        };

        let prefix = &caps[1];
        let scope = Scope::from_prefix(prefix).ok_or_else(|| StateError::UnknownScopePrefix {
            prefix: prefix.to_string(),
            key: key.to_string(),
        })?;

        let name = &key[caps[0].len()..];
        if name.is_empty() {
            return Err(StateError::EmptyKey);
        }

        Ok(StateKey {
            scope,
            name: name.to_string(),
        })
    }

    /// Address a key in an explicit scope. A prefixed name is accepted when its prefix
    /// agrees with `scope`.
    pub fn scoped(scope: Scope, name: &str) -> Result<Self, StateError> {
        let parsed = StateKey::parse(name)?;
        if parsed.scope == scope {
            return Ok(parsed);
        }
        // An unprefixed name is valid in any scope
        if parsed.scope == Scope::Session {
            return Ok(StateKey {
                scope,
                name: parsed.name,
            });
        }
        Err(StateError::ScopeMismatch {
            key: name.to_string(),
            expected: scope,
            found: parsed.scope,
        })
    }

    /// The key as it appears in exports, prefix included
    pub fn qualified(&self) -> String {
        format!("{}{}", self.scope.prefix(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixes() {
        let key = StateKey::parse("user:skin_type").unwrap();
        assert_eq!(key.scope, Scope::User);
        assert_eq!(key.name, "skin_type");

        assert_eq!(StateKey::parse("app:total").unwrap().scope, Scope::App);
        assert_eq!(StateKey::parse("temp:scratch").unwrap().scope, Scope::Temp);

        let key = StateKey::parse("user_role").unwrap();
        assert_eq!(key.scope, Scope::Session);
        assert_eq!(key.name, "user_role");
    }

    #[test]
    fn test_parse_rejects_unknown_prefix() {
        let err = StateKey::parse("usr:name").unwrap_err();
        assert_eq!(
            err,
            StateError::UnknownScopePrefix {
                prefix: "usr".to_string(),
                key: "usr:name".to_string()
            }
        );
        // Prefixes are case-sensitive
        assert!(StateKey::parse("User:name").is_err());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(StateKey::parse(""), Err(StateError::EmptyKey));
        assert_eq!(StateKey::parse("user:"), Err(StateError::EmptyKey));
    }

    #[test]
    fn test_keys_that_only_look_prefixed() {
        // A colon that does not follow a leading identifier is part of the name
        let key = StateKey::parse("12:30 meeting").unwrap();
        assert_eq!(key.scope, Scope::Session);
    }

    #[test]
    fn test_scoped() {
        let key = StateKey::scoped(Scope::User, "name").unwrap();
        assert_eq!(key.qualified(), "user:name");

        let key = StateKey::scoped(Scope::App, "app:counter").unwrap();
        assert_eq!(key.name, "counter");

        let err = StateKey::scoped(Scope::Session, "user:name").unwrap_err();
        assert!(matches!(err, StateError::ScopeMismatch { .. }));
    }
}
