//! Resume support for interrupted erase runs
//!
//! The engine records how far it got for each device identifier through a
//! [`ProgressStore`]. An entry exists only while a run is unfinished: it is
//! written on cancellation and by the periodic autosave, and removed when
//! the run completes.
//!
//! # Example
//!
//! ```ignore
//! use diskwipe_core::resume::{MemoryProgressStore, ProgressStore};
//!
//! let mut store = MemoryProgressStore::new();
//! store.set("WD-WCC4E1234567", 1_048_576)?;
//! assert_eq!(store.get("WD-WCC4E1234567"), Some(1_048_576));
//! store.remove("WD-WCC4E1234567")?;
//! ```

use crate::Result;
use std::collections::{BTreeMap, HashMap};

/// Identifier → last written offset
///
/// `get` must be cheap and side-effect free. `set` and `remove` may persist
/// the change and report failures; the engine tolerates failed autosaves.
pub trait ProgressStore {
    /// Saved offset for `identifier`, if any
    fn get(&self, identifier: &str) -> Option<u64>;

    /// Record `offset` for `identifier`, replacing any previous entry
    fn set(&mut self, identifier: &str, offset: u64) -> Result<()>;

    /// Forget `identifier`
    fn remove(&mut self, identifier: &str) -> Result<()>;
}

impl ProgressStore for HashMap<String, u64> {
    fn get(&self, identifier: &str) -> Option<u64> {
        HashMap::get(self, identifier).copied()
    }

    fn set(&mut self, identifier: &str, offset: u64) -> Result<()> {
        self.insert(identifier.to_string(), offset);
        Ok(())
    }

    fn remove(&mut self, identifier: &str) -> Result<()> {
        HashMap::remove(self, identifier);
        Ok(())
    }
}

impl ProgressStore for BTreeMap<String, u64> {
    fn get(&self, identifier: &str) -> Option<u64> {
        BTreeMap::get(self, identifier).copied()
    }

    fn set(&mut self, identifier: &str, offset: u64) -> Result<()> {
        self.insert(identifier.to_string(), offset);
        Ok(())
    }

    fn remove(&mut self, identifier: &str) -> Result<()> {
        BTreeMap::remove(self, identifier);
        Ok(())
    }
}

/// In-memory progress store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryProgressStore {
    entries: BTreeMap<String, u64>,
}

impl MemoryProgressStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unfinished runs tracked
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no run is tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(identifier, offset)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl From<BTreeMap<String, u64>> for MemoryProgressStore {
    fn from(entries: BTreeMap<String, u64>) -> Self {
        Self { entries }
    }
}

impl ProgressStore for MemoryProgressStore {
    fn get(&self, identifier: &str) -> Option<u64> {
        self.entries.get(identifier).copied()
    }

    fn set(&mut self, identifier: &str, offset: u64) -> Result<()> {
        self.entries.insert(identifier.to_string(), offset);
        Ok(())
    }

    fn remove(&mut self, identifier: &str) -> Result<()> {
        self.entries.remove(identifier);
        Ok(())
    }
}

/// Check a saved offset against the target it is about to be applied to
///
/// Returns the reason the offset cannot be used, or `None` when it is valid.
pub fn validate_resume_offset(offset: u64, total_size: u64) -> Option<String> {
    if offset > total_size {
        Some(format!(
            "saved offset {} is beyond the end of the target ({} bytes)",
            offset, total_size
        ))
    } else {
        None
    }
}
