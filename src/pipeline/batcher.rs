/*!
 * Document batcher.
 *
 * Splits the ordered id list of a collection into sequential, bounded
 * chunks. Order is preserved so a run is reproducible and resumable.
 */

/// Split ids into slices of at most `batch_size` ids, preserving order.
///
/// A batch size of zero is treated as one.
pub fn chunk_ids(ids: Vec<String>, batch_size: usize) -> Vec<Vec<String>> {
    let batch_size = batch_size.max(1);
    let mut chunks = Vec::with_capacity(batch_count(ids.len(), batch_size));
    let mut current = Vec::with_capacity(batch_size.min(ids.len()));

    for id in ids {
        current.push(id);
        if current.len() == batch_size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Number of batches `total` documents split into
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    total.div_ceil(batch_size.max(1))
}
