/*!
 * Per-batch translation cache.
 *
 * Each batch owns one cache, keyed by exact source text. Caches are never
 * shared between batches: batches run on isolated execution units and must
 * not share mutable state.
 */

use std::collections::HashMap;

/// Exact-text cache owned by a single batch
#[derive(Debug, Default)]
pub struct BatchCache {
    /// Source text -> translated (or passed-through) text
    entries: HashMap<String, String>,

    /// Cache hit counter
    hits: usize,

    /// Cache miss counter
    misses: usize,
}

impl BatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a source text, counting the hit or miss
    pub fn get(&mut self, source_text: &str) -> Option<String> {
        match self.entries.get(source_text) {
            Some(translation) => {
                self.hits += 1;
                Some(translation.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store the result for a source text
    pub fn store(&mut self, source_text: &str, translation: &str) {
        self.entries
            .insert(source_text.to_string(), translation.to_string());
    }

    /// Get cache statistics as (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let total = self.hits + self.misses;
        let hit_rate = if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        };
        (self.hits, self.misses, hit_rate)
    }

    /// Get the number of entries in the cache
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
