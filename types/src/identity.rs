//! Caller identity type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The principal attached to every ledger operation.
///
/// Opaque to the ledger: it is only ever compared and hashed. Typically an
/// account address supplied by the submission layer (e.g. `0x70997970…`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    /// Create an identity from a raw string. Surrounding whitespace is trimmed.
    pub fn new(raw: impl Into<String>) -> Self {
        let s: String = raw.into();
        Self(s.trim().to_string())
    }

    /// Return the raw identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An identity is usable only if it is non-empty.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
