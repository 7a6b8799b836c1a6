// src/crawl/seen.rs
// =============================================================================
// Users we have already emitted a record for.
//
// Append-only for the whole crawl: once an id is in here, no second record
// for it ever leaves the resolver.
// =============================================================================

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct SeenSet {
    ids: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Records `id`. Returns false if it was already there.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
