//! Value and mutation types
//!
//! Values are opaque byte payloads; the engine never interprets them.
//! A `Mutation` is what a transaction stages against a key: either a new
//! value or a tombstone. A tombstone represents deletion of a key as of a
//! specific commit timestamp, distinct from the key being absent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque byte payload stored against a key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Value(Vec<u8>);

impl Value {
    /// Create a value from raw bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the payload
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the value, returning the payload
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "<{} bytes>", self.0.len()),
        }
    }
}

/// A staged change to a key: a new value or a deletion marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Write a new value
    Put(Value),
    /// Delete the key as of the commit timestamp
    Tombstone,
}

impl Mutation {
    /// Whether this mutation is a tombstone
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Mutation::Tombstone)
    }

    /// The value carried by this mutation, or None for a tombstone
    pub fn value(&self) -> Option<&Value> {
        match self {
            Mutation::Put(v) => Some(v),
            Mutation::Tombstone => None,
        }
    }
}
