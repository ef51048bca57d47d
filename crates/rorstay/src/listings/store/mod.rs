//! Document-store boundary for listings.

mod memory;

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::query::PropertyQuery;

pub use memory::MemoryPropertyStore;

/// JSON object as held by the store.
pub type Document = Map<String, Value>;

/// Field holding the store-native identifier.
pub const NATIVE_ID_FIELD: &str = "_id";
/// Field holding the application-assigned identifier.
pub const DOMAIN_ID_FIELD: &str = "id";

const NATIVE_ID_LEN: usize = 24;

/// Store-generated identifier: 24 hexadecimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreId(String);

impl StoreId {
    /// Accepts only syntactically valid identifiers, normalized to lowercase.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() == NATIVE_ID_LEN && raw.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            Some(Self(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub(crate) fn from_parts(timestamp: u32, counter: u64) -> Self {
        Self(format!("{timestamp:08x}{counter:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which identifier space a lookup targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKey {
    Domain(String),
    Native(StoreId),
}

/// Counts reported by a single-document update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("document could not be encoded or decoded: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value.to_string())
    }
}

/// Storage abstraction so the listing service can be exercised in isolation.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Persists a new document and returns the store-native id assigned to it.
    async fn insert(&self, document: Document) -> Result<StoreId, StoreError>;
    async fn find_one(&self, key: &DocumentKey) -> Result<Option<Document>, StoreError>;
    /// Documents matching `query` in store iteration order, at most `query.limit()`.
    async fn find(&self, query: &PropertyQuery) -> Result<Vec<Document>, StoreError>;
    /// Sets each field of `changes` on the matched document.
    async fn update_one(
        &self,
        key: &DocumentKey,
        changes: Document,
    ) -> Result<UpdateOutcome, StoreError>;
    /// Returns the number of documents removed.
    async fn delete_one(&self, key: &DocumentKey) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_hex_identifiers_of_native_length() {
        let id = StoreId::parse("65F1A2B3C4D5E6F708192A3B").expect("valid id");
        assert_eq!(id.as_str(), "65f1a2b3c4d5e6f708192a3b");
        assert!(StoreId::parse("65f1a2b3c4d5e6f708192a3").is_none());
        assert!(StoreId::parse("65f1a2b3c4d5e6f708192a3z").is_none());
        assert!(StoreId::parse("4b0c8f2e-93a1-4f57-9d2a-1d3f1a1e9c11").is_none());
    }

    #[test]
    fn generated_identifiers_round_trip_through_parse() {
        let id = StoreId::from_parts(0x65f1_a2b3, 42);
        assert_eq!(StoreId::parse(id.as_str()), Some(id));
    }
}
