#![forbid(unsafe_code)]

//! Per-URL index ledger.
//!
//! # Invariants
//!
//! 1. Every stored value is `>= FIRST_INDEX`; an entry that would drop below
//!    it is removed instead.
//! 2. For a URL whose routes are pushed and popped in global LIFO order, the
//!    stored value equals the number of active routes with that URL.

use std::collections::HashMap;

/// Index assigned to the first open page of a URL.
pub const FIRST_INDEX: u32 = 1;

/// Mapping from URL to the highest active sequence index.
#[derive(Debug, Clone, Default)]
pub struct IndexLedger {
    last: HashMap<String, u32>,
}

impl IndexLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next push of `url` will receive.
    #[must_use]
    pub fn next_index(&self, url: &str) -> u32 {
        self.last.get(url).map_or(FIRST_INDEX, |last| last + 1)
    }

    /// Record that `url` was pushed with `index`.
    pub fn record_push(&mut self, url: &str, index: u32) {
        match self.last.get_mut(url) {
            Some(last) => *last = index,
            None => {
                self.last.insert(url.to_owned(), index);
            }
        }
    }

    /// Record that the route `url` with `index` was removed.
    pub fn record_pop(&mut self, url: &str, index: u32) {
        if index <= FIRST_INDEX {
            self.last.remove(url);
        } else {
            self.last.insert(url.to_owned(), index - 1);
        }
    }

    /// Highest active index for `url`.
    #[must_use]
    pub fn last_index(&self, url: &str) -> Option<u32> {
        self.last.get(url).copied()
    }

    /// Whether at least one page of `url` is open.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.last.get(url).is_some_and(|&last| last >= FIRST_INDEX)
    }

    /// Whether at least `index` pages of `url` are open.
    #[must_use]
    pub fn covers(&self, url: &str, index: u32) -> bool {
        self.last
            .get(url)
            .is_some_and(|&last| last >= FIRST_INDEX && last >= index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.last.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    /// Ledger entries sorted by URL.
    #[must_use]
    pub fn sorted_entries(&self) -> Vec<(String, u32)> {
        let mut entries: Vec<(String, u32)> = self
            .last
            .iter()
            .map(|(url, &index)| (url.clone(), index))
            .collect();
        entries.sort_unstable();
        entries
    }
}
