/*!
 * Batch worker.
 *
 * Transforms one batch of in-memory documents into per-document partial
 * updates. The worker never talks to the catalog store and shares no mutable
 * state with other batches: it owns its documents, its translation cache and
 * its stop signal.
 */

use log::debug;
use serde_json::Value;
use std::sync::Arc;

use super::cancellation::StopSignal;
use crate::app_config::{CollectionConfig, NestedTextConfig};
use crate::catalog::{Document, PartialUpdate};
use crate::providers::TranslationBackend;
use crate::translation::{LanguagePair, TextTranslator};

/// Read-only settings shared by every batch of a collection
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Which fields carry text
    pub collection: CollectionConfig,
    /// Languages of the run
    pub languages: LanguagePair,
    /// Field stamped with the target language on fully translated documents
    pub marker_field: Option<String>,
}

/// Outcome of one document
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// Document id
    pub id: String,
    /// Fields to write back; empty means no write
    pub update: PartialUpdate,
    /// False when the stop signal was raised before the document was reached
    pub visited: bool,
    /// True when the stop signal cut the document's traversal short
    pub interrupted: bool,
}

impl BatchResult {
    fn unvisited(id: String) -> Self {
        Self {
            id,
            update: PartialUpdate::new(),
            visited: false,
            interrupted: false,
        }
    }

    /// Whether the stop signal left this document not fully scanned
    pub fn stopped_early(&self) -> bool {
        !self.visited || self.interrupted
    }
}

/// Translate a batch of documents.
///
/// Every input document yields exactly one result, in input order.
pub async fn process_batch(
    documents: Vec<Document>,
    stop: StopSignal,
    backend: Arc<dyn TranslationBackend>,
    context: Arc<WorkerContext>,
) -> Vec<BatchResult> {
    let mut translator = TextTranslator::new(backend.as_ref(), &context.languages);
    let mut results = Vec::with_capacity(documents.len());

    for document in documents {
        if stop.is_stop_requested() {
            results.push(BatchResult::unvisited(document.id));
            continue;
        }

        let (update, complete) =
            translate_document(&document, &stop, &mut translator, &context).await;
        results.push(BatchResult {
            id: document.id,
            update,
            visited: true,
            interrupted: !complete,
        });
    }

    translator.log_stats(&format!("Batch of {}", context.collection.name));
    results
}

/// Returns the staged update and whether the traversal ran to the end
async fn translate_document(
    document: &Document,
    stop: &StopSignal,
    translator: &mut TextTranslator<'_>,
    context: &WorkerContext,
) -> (PartialUpdate, bool) {
    let mut update = PartialUpdate::new();
    let fallbacks_before = translator.fallbacks();

    for field in &context.collection.text_fields {
        if let Some(text) = document.text(field) {
            if !text.trim().is_empty() {
                update.set(field.clone(), translator.translate(text).await);
            }
        }
    }

    let mut complete = true;
    if let Some(nested) = &context.collection.nested {
        if let Some(value) = document.get(&nested.field).filter(|v| v.is_array()) {
            // read whole, transform whole, write whole
            let mut whole = value.clone();
            complete = translate_nested(&mut whole, nested, stop, translator).await;
            update.set(nested.field.clone(), whole);
            if !complete {
                debug!("Stopped inside {} of document {}", nested.field, document.id);
            }
        }
    }

    // documents still holding source text stay eligible for the next run
    let translated = translator.fallbacks() == fallbacks_before;
    if complete && translated && !update.is_empty() {
        if let Some(marker) = &context.marker_field {
            update.set(marker.clone(), context.languages.target.clone());
        }
    }

    (update, complete)
}

/// Translate every inner item in place. Returns false if the stop signal cut
/// the traversal short.
async fn translate_nested(
    whole: &mut Value,
    nested: &NestedTextConfig,
    stop: &StopSignal,
    translator: &mut TextTranslator<'_>,
) -> bool {
    let Some(outer) = whole.as_array_mut() else {
        return true;
    };

    for element in outer.iter_mut() {
        let Some(items) = element
            .get_mut(nested.items_field.as_str())
            .and_then(Value::as_array_mut)
        else {
            continue;
        };

        for item in items.iter_mut() {
            if stop.is_stop_requested() {
                return false;
            }
            for field in &nested.text_fields {
                if let Some(Value::String(text)) = item.get_mut(field.as_str()) {
                    if !text.trim().is_empty() {
                        let translated = translator.translate(text).await;
                        *text = translated;
                    }
                }
            }
        }
    }

    true
}
