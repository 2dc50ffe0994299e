use std::collections::BTreeMap;

use crate::store::MatchStore;

/// Single-level name substitution (slave -> master).
///
/// Resolution is never chased: a master that later shows up as a slave key
/// is not re-resolved. Entries iterate in key order so the persisted file is
/// deterministic.
#[derive(Clone, Debug, Default)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical name for `name`: the mapped master, or `name` itself.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn contains(&self, slave: &str) -> bool {
        self.entries.contains_key(slave)
    }

    /// Insert or replace. Returns true when an existing alias was replaced.
    pub fn set(&mut self, slave: String, master: String) -> bool {
        self.entries.insert(slave, master).is_some()
    }

    /// Returns false when the slave was not aliased.
    pub fn remove(&mut self, slave: &str) -> bool {
        self.entries.remove(slave).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-resolve every name already stored in every match's signup lists
    /// against the current table. Run after any table change so recorded
    /// signups reflect the new mapping, not just future lookups.
    pub fn reapply(&self, store: &mut MatchStore) {
        store.map_names(|name| self.resolve(name).to_string());
    }
}
