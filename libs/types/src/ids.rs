//! Identifier types for listings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a listing
///
/// Assigned by the store from a monotonic counter and never reused.
/// Serialized as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(u64);

impl ListingId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ListingId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_id_serializes_as_integer() {
        let id = ListingId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");

        let parsed: ListingId = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, ListingId::new(7));
    }

    #[test]
    fn test_listing_id_ordering() {
        assert!(ListingId::new(1) < ListingId::new(2));
        assert_eq!(ListingId::from(3).to_string(), "3");
    }
}
