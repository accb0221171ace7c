//! The `Command` data model.
//!
//! Adapters (TCP, HTTP — `ramdb-server`) own parsing and validation; by the
//! time a `Command` reaches this crate it is already well-formed. The
//! grammar itself (`is_valid_token`) is centralized here so every adapter
//! validates identically rather than re-deriving the character class.

use std::fmt;

/// A parsed, validated client request. `key` is the identity for map
/// operations; `value` is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get(String),
    Set(String, String),
    Del(String),
}

impl Command {
    /// Build a validated `Set`. `None` if either token fails the grammar.
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Option<Self> {
        let (key, value) = (key.into(), value.into());
        (is_valid_token(&key) && is_valid_token(&value)).then_some(Command::Set(key, value))
    }

    /// Build a validated `Get`. `None` if `key` fails the grammar.
    pub fn get(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        is_valid_token(&key).then_some(Command::Get(key))
    }

    /// Build a validated `Del`. `None` if `key` fails the grammar.
    pub fn del(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        is_valid_token(&key).then_some(Command::Del(key))
    }

    /// The key every variant carries.
    pub fn key(&self) -> &str {
        match self {
            Command::Get(k) | Command::Set(k, _) | Command::Del(k) => k,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Get(k) => write!(f, "GET {k}"),
            Command::Set(k, v) => write!(f, "SET {k} {v}"),
            Command::Del(k) => write!(f, "DEL {k}"),
        }
    }
}

/// `key`/`value` grammar: non-empty, printable ASCII, `[A-Za-z0-9*_/]+`.
pub fn is_valid_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'*' | b'_' | b'/'))
}
