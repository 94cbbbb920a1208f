/*!
 * Text translation for catalog documents.
 *
 * - `cache`: exact-text cache owned by one batch
 * - `translator`: fail-soft wrapper around a translation backend
 */

// Re-export main types for easier usage
pub use self::cache::BatchCache;
pub use self::translator::TextTranslator;

// Submodules
pub mod cache;
pub mod translator;

/// Source and target language of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}
