//! Caller-side validation of provider responses.
//!
//! Batches and sub-batches are checked before anything is handed to the
//! consumer: a validation failure means the whole batch is withheld.

use crate::IngestError;
use firth_types::{Block, BlockConsistencyError, HashAndHeight};

/// Verifies that `blocks` form a parent-linked, ascending, height-contiguous
/// chain and that no block carries an invalid marker.
///
/// When `attach_to` is given, the first block must additionally link to it.
pub fn check_continuity<B: Block>(
    attach_to: Option<&HashAndHeight>,
    blocks: &[B],
) -> Result<(), IngestError> {
    let mut prev = attach_to.cloned();
    for block in blocks {
        if let Some(reason) = block.invalid_reason() {
            return Err(BlockConsistencyError::new(block.header().as_pair(), reason).into());
        }
        if let Some(prev) = prev.as_ref() {
            if block.height() != prev.height + 1 || block.parent_hash() != prev.hash {
                return Err(IngestError::BrokenChain {
                    block: block.header().as_pair(),
                    parent: block.parent_hash(),
                    expected: prev.hash,
                });
            }
        }
        prev = Some(block.header().as_pair());
    }
    Ok(())
}

/// Validates a cold-path batch against the stride it was fetched for: full
/// coverage of `[from, to]`, contiguity, and no invalid markers.
pub fn check_batch<B: Block>(blocks: &[B], from: u64, to: u64) -> Result<(), IngestError> {
    let expected = to - from + 1;
    let first = blocks.first().map(Block::height);
    let last = blocks.last().map(Block::height);
    if blocks.len() as u64 != expected || first != Some(from) || last != Some(to) {
        return Err(BlockConsistencyError::new(
            format!("#{from}..#{to}"),
            format!(
                "expected {expected} blocks covering the stride, got {} spanning {:?}..{:?}",
                blocks.len(),
                first,
                last
            ),
        )
        .into());
    }
    check_continuity(None, blocks)
}
