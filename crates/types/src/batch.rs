//! Batches emitted by the cold ingest engine.

/// A contiguous, ordered slice of fetched blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<B> {
    /// The fetched blocks, in ascending height order.
    pub blocks: Vec<B>,
    /// Whether the last block was, at fetch time, the current chain head.
    pub is_head: bool,
}

impl<B> Batch<B> {
    /// Creates a new [`Batch`].
    pub const fn new(blocks: Vec<B>, is_head: bool) -> Self {
        Self { blocks, is_head }
    }
}
