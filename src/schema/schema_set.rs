//! Concurrent append-only set of schema identifiers.
//!
//! Every protocol object carries the schema identifiers that declare its shape.
//! Identifiers compare case-insensitively, keep their first-seen spelling and
//! insertion order, and are never removed. Insertion is an atomic
//! insert-if-absent so concurrent registrations of the same identifier settle
//! on a single entry.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Entries {
    ordered: Vec<String>,
    folded: HashSet<String>,
}

/// Ordered, duplicate-free, case-insensitive set of schema identifiers.
#[derive(Default)]
pub struct SchemaSet {
    entries: Mutex<Entries>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identifier. Returns `false` when an equal identifier is already present.
    pub fn add(&self, identifier: impl Into<String>) -> bool {
        let identifier = identifier.into();
        let folded = identifier.to_ascii_lowercase();
        let mut entries = self.lock();
        if !entries.folded.insert(folded) {
            return false;
        }
        entries.ordered.push(identifier);
        true
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.lock()
            .folded
            .contains(&identifier.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.lock().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the identifiers in insertion order.
    pub fn to_vec(&self) -> Vec<String> {
        self.lock().ordered.clone()
    }

    /// Identifiers not accepted by `known`, in insertion order.
    pub fn unrecognized(&self, known: impl Fn(&str) -> bool) -> Vec<String> {
        self.lock()
            .ordered
            .iter()
            .filter(|identifier| !known(identifier))
            .cloned()
            .collect()
    }

    // The set is append-only and every mutation completes before the guard
    // drops, so a poisoned lock still holds consistent data.
    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: Into<String>> FromIterator<S> for SchemaSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let set = SchemaSet::new();
        for identifier in iter {
            set.add(identifier);
        }
        set
    }
}

impl Clone for SchemaSet {
    fn clone(&self) -> Self {
        self.to_vec().into_iter().collect()
    }
}

impl PartialEq for SchemaSet {
    fn eq(&self, other: &Self) -> bool {
        let mine = self.to_vec();
        mine.len() == other.len() && mine.iter().all(|identifier| other.contains(identifier))
    }
}

impl Eq for SchemaSet {}

impl fmt::Debug for SchemaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

impl Serialize for SchemaSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_vec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let identifiers = Vec::<String>::deserialize(deserializer)?;
        Ok(identifiers.into_iter().collect())
    }
}
