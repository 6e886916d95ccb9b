//! Hot chain tracking types.

use crate::{BlockRef, HashAndHeight};

/// The in-memory chain window tracked by the hot processor.
///
/// `base` is the oldest retained block, generally the last finalized block the
/// caller has processed; `top` is the window of blocks above it, ascending by
/// height, each linked to the previous by parent hash (checked on ingestion).
///
/// This is the only cross-run state a caller must persist to resume hot
/// tracking; its absence means "start from the finalized head with an empty
/// window".
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HotState {
    /// The hash of the base block.
    pub hash: alloy_primitives::B256,
    /// The height of the base block.
    pub height: u64,
    /// The unfinalized blocks above the base, ascending by height.
    pub top: Vec<HashAndHeight>,
}

impl HotState {
    /// Creates a window holding only the given base block.
    pub const fn new(base: HashAndHeight) -> Self {
        Self { hash: base.hash, height: base.height, top: Vec::new() }
    }

    /// The base of the window.
    pub const fn base(&self) -> HashAndHeight {
        HashAndHeight { hash: self.hash, height: self.height }
    }

    /// The best block of the window (the base when the window is empty).
    pub fn head(&self) -> HashAndHeight {
        self.top.last().cloned().unwrap_or_else(|| self.base())
    }

    /// The window entry at the given height, when retained.
    pub fn entry_at(&self, height: u64) -> Option<HashAndHeight> {
        if height == self.height {
            return Some(self.base());
        }
        let offset = height.checked_sub(self.height + 1)?;
        self.top.get(offset as usize).cloned()
    }

    /// Returns `true` if the given reference identifies a block in the window.
    ///
    /// Hash-only references are matched against every entry; height-bound
    /// references are satisfied by any window reaching that height.
    pub fn contains(&self, reference: &BlockRef) -> bool {
        match (reference.hash(), reference.height()) {
            (Some(hash), _) => {
                self.hash == hash || self.top.iter().any(|entry| entry.hash == hash)
            }
            (None, Some(height)) => height <= self.head().height,
            (None, None) => false,
        }
    }
}

/// A `(best, finalized)` head pair observed on the remote chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHeads {
    /// The current best (tip) block.
    pub best: BlockRef,
    /// The current finalized block. May arrive hash-only, in which case the
    /// hot processor resolves its height lazily.
    pub finalized: BlockRef,
}

/// One reconciliation step of the hot processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotUpdate<B> {
    /// The blocks newly part of the canonical chain, in ascending height
    /// order. May be empty, signaling pure finalization advancement.
    pub blocks: Vec<B>,
    /// The block the new blocks attach to: the first block's parent.
    pub base_head: HashAndHeight,
    /// The new finalized cutoff.
    pub finalized_head: HashAndHeight,
}
