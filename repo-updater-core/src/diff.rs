//! Identity-keyed list diff.
//!
//! [`diff`] classifies two collections, what the sources currently report
//! ("sourced") and what the store currently holds ("stored"), into three
//! disjoint lists:
//!
//! | classification | identity in sourced | identity in stored | taken from |
//! |----------------|---------------------|--------------------|------------|
//! | added          | yes                 | no                 | sourced    |
//! | modified       | yes                 | yes, `equal` false | sourced    |
//! | deleted        | no                  | yes                | stored     |
//!
//! Entities present on both sides for which `equal` holds are unchanged and
//! appear in none of the lists. Only identity (see [`Diffable::key`]) is used
//! for matching; payload comparison is entirely up to the caller's predicate.
//!
//! Within one input, the first entity seen for a given identity wins; later
//! duplicates are dropped.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Capability required to take part in a [`diff`]: a stable identity.
pub trait Diffable {
    type Key: Eq + Hash + Clone;

    fn key(&self) -> Self::Key;
}

/// Result of diffing sourced against stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff<T> {
    pub added: Vec<T>,
    pub modified: Vec<T>,
    pub deleted: Vec<T>,
}

impl<T> Default for Diff<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            modified: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<T> Diff<T> {
    /// Total number of changed entities.
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Diff `sourced` against `stored`.
///
/// Added and modified keep the order of `sourced`; deleted keeps the order of
/// `stored`. The function is pure.
pub fn diff<T, F>(sourced: Vec<T>, stored: Vec<T>, equal: F) -> Diff<T>
where
    T: Diffable,
    F: Fn(&T, &T) -> bool,
{
    let mut by_key: HashMap<T::Key, T> = HashMap::with_capacity(stored.len());
    let mut stored_order: Vec<T::Key> = Vec::with_capacity(stored.len());
    for entity in stored {
        let key = entity.key();
        if by_key.contains_key(&key) {
            continue;
        }
        stored_order.push(key.clone());
        by_key.insert(key, entity);
    }

    let mut result = Diff::default();
    let mut seen: HashSet<T::Key> = HashSet::with_capacity(sourced.len());
    for entity in sourced {
        let key = entity.key();
        if !seen.insert(key.clone()) {
            continue;
        }
        match by_key.get(&key) {
            None => result.added.push(entity),
            Some(existing) if !equal(&entity, existing) => result.modified.push(entity),
            Some(_) => {}
        }
    }

    for key in stored_order {
        if seen.contains(&key) {
            continue;
        }
        if let Some(entity) = by_key.remove(&key) {
            result.deleted.push(entity);
        }
    }

    result
}
