/*!
 * Fail-soft text translator.
 *
 * Wraps a translation backend for the lifetime of one batch. Blank input
 * never reaches the backend, repeated texts are served from the batch cache,
 * and a failed call yields the original text so the catalog always keeps
 * some text.
 */

use log::{debug, warn};
use std::collections::HashSet;

use super::cache::BatchCache;
use super::LanguagePair;
use crate::providers::TranslationBackend;

/// Batch-scoped translator over a backend
pub struct TextTranslator<'a> {
    backend: &'a dyn TranslationBackend,
    languages: &'a LanguagePair,
    cache: BatchCache,
    failures: usize,
    /// Texts whose cached value is the untranslated original
    passthrough: HashSet<String>,
    /// Number of times an untranslated original was returned
    fallbacks: usize,
}

impl<'a> TextTranslator<'a> {
    /// Create a translator with a fresh cache
    pub fn new(backend: &'a dyn TranslationBackend, languages: &'a LanguagePair) -> Self {
        Self {
            backend,
            languages,
            cache: BatchCache::new(),
            failures: 0,
            passthrough: HashSet::new(),
            fallbacks: 0,
        }
    }

    /// Translate a text, never failing
    pub async fn translate(&mut self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        if let Some(cached) = self.cache.get(text) {
            if self.passthrough.contains(text) {
                self.fallbacks += 1;
            }
            return cached;
        }

        let translated = match self
            .backend
            .translate(text, &self.languages.source, &self.languages.target)
            .await
        {
            Ok(translated) => translated,
            Err(e) => {
                self.failures += 1;
                self.fallbacks += 1;
                self.passthrough.insert(text.to_string());
                warn!(
                    "Translation failed, keeping original text ({}): {}",
                    truncate_text(text, 30),
                    e
                );
                text.to_string()
            }
        };

        self.cache.store(text, &translated);
        translated
    }

    /// Number of backend failures absorbed so far
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Number of texts handed back untranslated, cache hits included
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    /// Cache statistics as (hits, misses, hit rate)
    pub fn cache_stats(&self) -> (usize, usize, f64) {
        self.cache.stats()
    }

    /// Log cache statistics for the finished batch
    pub fn log_stats(&self, label: &str) {
        let (hits, misses, rate) = self.cache.stats();
        debug!(
            "{}: cache {} hits / {} misses ({:.0}%), {} failed call(s)",
            label,
            hits,
            misses,
            rate * 100.0,
            self.failures
        );
    }
}

/// Truncate text to a maximum number of characters with ellipsis
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
