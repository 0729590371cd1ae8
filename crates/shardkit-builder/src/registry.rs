//! Ordered name-to-entry mapping owned by a single builder.

use indexmap::IndexMap;

use crate::error::{BuilderError, Result};

/// Ordered mapping from column name to an entry.
///
/// Partitions register column builders here, streams register data types.
/// Iteration follows registration order. Re-adding an existing name replaces
/// the entry in place; dropping a name closes the gap.
#[derive(Debug)]
pub struct ColumnRegistry<T> {
    entries: IndexMap<String, T>,
}

impl<T> ColumnRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Register `entry` under `name`, returning the entry it replaced.
    pub fn add(&mut self, name: impl Into<String>, entry: T) -> Option<T> {
        self.entries.insert(name.into(), entry)
    }

    pub fn get(&self, name: &str) -> Result<&T> {
        self.entries.get(name).ok_or_else(|| not_found(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut T> {
        self.entries.get_mut(name).ok_or_else(|| not_found(name))
    }

    /// Remove `name`. Fails with `NotFound` if it was never registered.
    pub fn remove(&mut self, name: &str) -> Result<T> {
        self.entries.shift_remove(name).ok_or_else(|| not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for ColumnRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(name: &str) -> BuilderError {
    BuilderError::NotFound {
        name: name.to_string(),
    }
}
