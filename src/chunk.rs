use crate::domain::AccessionId;

/// Largest number of IDs sent to efetch in one request.
pub const DEFAULT_BATCH_SIZE: usize = 9900;

/// Splits `ids` into contiguous batches of at most `size` items, in order.
///
/// `size` must be non-zero; config resolution rejects a zero batch size before
/// the pipeline gets here.
pub fn batches(ids: &[AccessionId], size: usize) -> std::slice::Chunks<'_, AccessionId> {
    ids.chunks(size.max(1))
}

/// Number of batches `batches` will yield for `len` items.
pub fn batch_count(len: usize, size: usize) -> usize {
    len.div_ceil(size.max(1))
}
