//! Query node identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a query node.
///
/// Ids are minted from a global counter and never reused. A node keeps its
/// id across edits that rebuild it in place; a replacement node gets a fresh
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(u64);

impl QueryId {
    /// Mint a new id.
    pub fn fresh() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_unique_and_increasing() {
        let a = QueryId::fresh();
        let b = QueryId::fresh();
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(format!("{a}"), format!("q{}", a.as_u64()));
    }
}
