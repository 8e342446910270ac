//! Translation between front-end node names and names in the store.
//!
//! A [`NameMap`] lets a session expose a stored entry under a different
//! name, e.g. to present a store name that is not a natural name as one
//! that is. The map is a bijection; names without an entry pass through
//! unchanged. A stored name that has a front-end alias is only reachable
//! through that alias.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PathError, PathResult};
use crate::names::validate_name;

/// Bijective front-end <-> store name map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct NameMap {
    to_store: BTreeMap<String, String>,
    from_store: BTreeMap<String, String>,
}

impl NameMap {
    /// Create an empty (identity) map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no translation is configured.
    pub fn is_empty(&self) -> bool {
        self.to_store.is_empty()
    }

    /// Add a translation from `front` (front-end name) to `stored`.
    pub fn insert(&mut self, front: &str, stored: &str) -> PathResult<()> {
        validate_name(front)?;
        validate_name(stored)?;
        if self.to_store.contains_key(front) {
            return Err(PathError::ConflictingTranslation {
                name: front.to_string(),
            });
        }
        if self.from_store.contains_key(stored) {
            return Err(PathError::ConflictingTranslation {
                name: stored.to_string(),
            });
        }
        self.to_store.insert(front.to_string(), stored.to_string());
        self.from_store.insert(stored.to_string(), front.to_string());
        Ok(())
    }

    /// The store name for a front-end name.
    pub fn to_store<'a>(&'a self, front: &'a str) -> &'a str {
        self.to_store.get(front).map(String::as_str).unwrap_or(front)
    }

    /// The front-end name for a store name.
    pub fn to_front<'a>(&'a self, stored: &'a str) -> &'a str {
        self.from_store.get(stored).map(String::as_str).unwrap_or(stored)
    }

    /// Returns `true` if `front` may be used to address a stored entry.
    ///
    /// A raw store name that is aliased by another front-end name is hidden.
    pub fn is_addressable(&self, front: &str) -> bool {
        self.to_store.contains_key(front) || !self.from_store.contains_key(front)
    }
}

impl TryFrom<BTreeMap<String, String>> for NameMap {
    type Error = PathError;

    fn try_from(entries: BTreeMap<String, String>) -> PathResult<Self> {
        let mut map = NameMap::new();
        for (front, stored) in &entries {
            map.insert(front, stored)?;
        }
        Ok(map)
    }
}

impl From<NameMap> for BTreeMap<String, String> {
    fn from(map: NameMap) -> Self {
        map.to_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_by_default() {
        let map = NameMap::new();
        assert!(map.is_empty());
        assert_eq!(map.to_store("array"), "array");
        assert_eq!(map.to_front("array"), "array");
        assert!(map.is_addressable("array"));
    }

    #[test]
    fn translates_both_ways() {
        let mut map = NameMap::new();
        map.insert("pythonarray", "array").unwrap();
        assert_eq!(map.to_store("pythonarray"), "array");
        assert_eq!(map.to_front("array"), "pythonarray");
        assert_eq!(map.to_store("other"), "other");
    }

    #[test]
    fn aliased_store_name_is_hidden() {
        let mut map = NameMap::new();
        map.insert("pythonarray", "array").unwrap();
        assert!(map.is_addressable("pythonarray"));
        assert!(!map.is_addressable("array"));
    }

    #[test]
    fn reject_conflicts() {
        let mut map = NameMap::new();
        map.insert("a", "x").unwrap();
        assert!(map.insert("a", "y").is_err());
        assert!(map.insert("b", "x").is_err());
        assert!(map.insert("", "x").is_err());
    }

    #[test]
    fn build_from_btreemap() {
        let mut entries = BTreeMap::new();
        entries.insert("front".to_string(), "stored".to_string());
        let map = NameMap::try_from(entries).unwrap();
        assert_eq!(map.to_store("front"), "stored");
    }
}
