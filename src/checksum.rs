//! Catalog fingerprints
//!
//! A generation's fingerprint is the SHA256 of its canonical flattened form,
//! so two catalogs with identical entries always share a fingerprint.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 checksum, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Checksum over `(path, text)` pairs, in the order given.
    ///
    /// Each pair is length-prefixed so no concatenation of two entries can
    /// collide with a different split.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, &'a str)>,
    {
        let mut hasher = Sha256::new();
        for (path, text) in entries {
            hasher.update((path.len() as u64).to_le_bytes());
            hasher.update(path.as_bytes());
            hasher.update((text.len() as u64).to_le_bytes());
            hasher.update(text.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_checksum_consistency() {
        let a = Checksum::from_entries(vec![("waqi::title".to_string(), "WAQI")]);
        let b = Checksum::from_entries(vec![("waqi::title".to_string(), "WAQI")]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(a.short().len(), 12);
    }

    #[test]
    fn test_entries_checksum_is_split_sensitive() {
        let a = Checksum::from_entries(vec![("ab".to_string(), "c")]);
        let b = Checksum::from_entries(vec![("a".to_string(), "bc")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_entries_checksum_is_order_sensitive() {
        let a = Checksum::from_entries(vec![("a".to_string(), "1"), ("b".to_string(), "2")]);
        let b = Checksum::from_entries(vec![("b".to_string(), "2"), ("a".to_string(), "1")]);
        assert_ne!(a, b);
    }
}
