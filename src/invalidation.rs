use crate::cache::CacheKey;
use crate::row::CellKey;
use std::collections::{HashMap, HashSet};

/// One-shot "force recompute" markers keyed by cell.
#[derive(Debug, Default)]
pub(crate) struct InvalidationIndex {
    marked: HashSet<CellKey>,
}

impl InvalidationIndex {
    pub fn mark(&mut self, cell: CellKey) {
        self.marked.insert(cell);
    }

    /// Removes a marker without forcing anything. Returns whether one was pending.
    pub fn clear(&mut self, cell: &CellKey) -> bool {
        self.marked.remove(cell)
    }

    /// Reads and deletes the marker in one step.
    pub fn take(&mut self, cell: &CellKey) -> bool {
        self.marked.remove(cell)
    }

    pub fn is_marked(&self, cell: &CellKey) -> bool {
        self.marked.contains(cell)
    }

    /// Drops every pending marker for a row.
    pub fn clear_row(&mut self, row_id: &str) -> usize {
        let before = self.marked.len();
        self.marked.retain(|c| c.row_id != row_id);
        before - self.marked.len()
    }

    pub fn clear_all(&mut self) {
        self.marked.clear();
    }

    pub fn len(&self) -> usize {
        self.marked.len()
    }
}

/// Which live result cache keys were written or read on behalf of which cell.
///
/// Cache keys are derived from function and arguments only, so this is what lets a
/// cell's entries be found again when one of its upstream values changes. Only keys
/// that are in the result cache are tracked; keys leave when their entry does.
#[derive(Debug, Default)]
pub(crate) struct Provenance {
    by_cell: HashMap<CellKey, HashSet<CacheKey>>,
    by_key: HashMap<CacheKey, HashSet<CellKey>>,
}

impl Provenance {
    pub fn record(&mut self, cell: &CellKey, key: &CacheKey) {
        self.by_cell.entry(cell.clone()).or_default().insert(key.clone());
        self.by_key.entry(key.clone()).or_default().insert(cell.clone());
    }

    /// Removes and returns every key recorded for `cell`. The keys are forgotten for all
    /// other cells too, since the caller drops their cache entries.
    pub fn take(&mut self, cell: &CellKey) -> HashSet<CacheKey> {
        let keys = self.by_cell.remove(cell).unwrap_or_default();
        for key in &keys {
            self.forget(key);
        }
        keys
    }

    /// Removes and returns the keys of every cell in `row_id`.
    pub fn take_row(&mut self, row_id: &str) -> Vec<CacheKey> {
        let cells: Vec<CellKey> = self.by_cell.keys().filter(|c| c.row_id == row_id).cloned().collect();
        cells.iter().flat_map(|c| self.take(c)).collect()
    }

    /// Forgets a key whose cache entry is gone.
    pub fn forget(&mut self, key: &CacheKey) {
        for cell in self.by_key.remove(key).unwrap_or_default() {
            if let Some(keys) = self.by_cell.get_mut(&cell) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_cell.remove(&cell);
                }
            }
        }
    }

    /// Forgets every key of `function`.
    pub fn forget_function(&mut self, function: &str) {
        let keys: Vec<CacheKey> = self.by_key.keys().filter(|k| k.function == function).cloned().collect();
        for key in &keys {
            self.forget(key);
        }
    }

    /// Number of distinct cache keys tracked.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn clear(&mut self) {
        self.by_cell.clear();
        self.by_key.clear();
    }
}
