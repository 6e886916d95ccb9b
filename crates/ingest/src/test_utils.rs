//! Scripted in-memory chain fixtures shared by the engine tests.

use crate::{ChainProvider, ProviderError};
use alloy_primitives::{B256, keccak256};
use async_trait::async_trait;
use firth_types::{Block, BlockHeader, BlockRef};
use futures::{StreamExt, stream, stream::BoxStream};
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Mutex,
};

/// Deterministic hash for a human-readable block label.
pub(crate) fn hash(label: &str) -> B256 {
    keccak256(label.as_bytes())
}

/// A minimal header-only block payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TestBlock {
    header: BlockHeader,
    invalid: Option<String>,
}

impl TestBlock {
    /// A block labeled `label` at `height`, linked to the block labeled
    /// `parent`.
    pub(crate) fn linked(label: &str, height: u64, parent: &str) -> Self {
        Self { header: BlockHeader::new(hash(label), height, hash(parent)), invalid: None }
    }

    /// Marks the block as invalid, as an upstream field-fetch step would.
    pub(crate) fn invalidated(mut self, reason: &str) -> Self {
        self.invalid = Some(reason.to_owned());
        self
    }
}

impl Block for TestBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn invalid_reason(&self) -> Option<&str> {
        self.invalid.as_deref()
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// The canonical chain, by height.
    canonical: BTreeMap<u64, TestBlock>,
    /// Every block ever observed, canonical or forked, by hash.
    by_hash: HashMap<B256, TestBlock>,
    /// Scripted finalized-head heights; the last entry repeats forever.
    finalized_script: VecDeque<u64>,
    /// Number of single-block fetches served, for reorg-walk assertions.
    block_calls: u64,
}

/// A scripted in-memory [`ChainProvider`].
///
/// Tests arrange a canonical chain (plus forked blocks reachable by hash) and
/// optionally a script of finalized heights; the provider then answers the
/// engine's calls from that state. `set_canonical` swaps the canonical chain
/// mid-test to simulate a reorg.
#[derive(Debug, Default)]
pub(crate) struct TestChain {
    inner: Mutex<Inner>,
    /// Sub-batch size used by `block_range`.
    pub(crate) chunk_size: usize,
}

impl TestChain {
    pub(crate) fn new() -> Self {
        Self { inner: Mutex::default(), chunk_size: usize::MAX }
    }

    pub(crate) fn with_chunk_size(chunk_size: usize) -> Self {
        Self { inner: Mutex::default(), chunk_size }
    }

    /// Replaces the canonical chain. Superseded blocks stay resolvable by
    /// hash, as they would on a real archive node.
    pub(crate) fn set_canonical(&self, blocks: Vec<TestBlock>) {
        let mut inner = self.inner.lock().unwrap();
        inner.canonical.clear();
        for block in blocks {
            inner.by_hash.insert(block.hash(), block.clone());
            inner.canonical.insert(block.height(), block);
        }
    }

    /// Registers a non-canonical block reachable only by hash.
    pub(crate) fn insert_fork(&self, block: TestBlock) {
        self.inner.lock().unwrap().by_hash.insert(block.hash(), block);
    }

    /// Scripts the heights `finalized_head` reports, in order; the last one
    /// repeats.
    pub(crate) fn script_finalized(&self, heights: &[u64]) {
        self.inner.lock().unwrap().finalized_script = heights.iter().copied().collect();
    }

    pub(crate) fn single_block_fetches(&self) -> u64 {
        self.inner.lock().unwrap().block_calls
    }

    fn canonical_head_height(inner: &Inner) -> u64 {
        inner.canonical.keys().next_back().copied().unwrap_or_default()
    }
}

#[async_trait]
impl ChainProvider for TestChain {
    type Block = TestBlock;
    type Request = ();

    async fn finalized_head(&self) -> Result<BlockHeader, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        let height = match inner.finalized_script.len() {
            0 => Self::canonical_head_height(&inner),
            1 => inner.finalized_script[0],
            _ => inner.finalized_script.pop_front().unwrap(),
        };
        let block = inner.canonical.get(&height).ok_or_else(|| ProviderError::BlockNotFound {
            reference: format!("#{height}"),
        })?;
        Ok(block.header().clone())
    }

    async fn block(
        &self,
        reference: &BlockRef,
        _request: Option<&Self::Request>,
    ) -> Result<Self::Block, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.block_calls += 1;
        let found = match (reference.hash(), reference.height()) {
            (Some(hash), _) => inner.by_hash.get(&hash),
            (None, Some(height)) => inner.canonical.get(&height),
            (None, None) => None,
        };
        found.cloned().ok_or_else(|| ProviderError::BlockNotFound {
            reference: reference.to_string(),
        })
    }

    fn block_range<'a>(
        &'a self,
        from: u64,
        to: BlockRef,
        _request: Option<&'a Self::Request>,
    ) -> BoxStream<'a, Result<Vec<Self::Block>, ProviderError>> {
        let inner = self.inner.lock().unwrap();
        let to_block = match to.hash() {
            Some(hash) => inner.by_hash.get(&hash).cloned(),
            None => to.height().and_then(|h| inner.canonical.get(&h).cloned()),
        };
        let chunks: Vec<Result<Vec<TestBlock>, ProviderError>> = match to_block {
            // A height-only end the chain does not reach resolves to nothing.
            None if to.hash().is_none() => Vec::new(),
            None => vec![Err(ProviderError::BlockNotFound { reference: to.to_string() })],
            Some(to_block) if from > to_block.height() => {
                // Coerce an inverted range to just the known end block.
                vec![Ok(vec![to_block])]
            }
            Some(to_block) => {
                let mut blocks: Vec<TestBlock> = inner
                    .canonical
                    .range(from..to_block.height())
                    .map(|(_, b)| b.clone())
                    .collect();
                blocks.push(to_block);
                blocks
                    .chunks(self.chunk_size.max(1))
                    .map(|chunk| Ok(chunk.to_vec()))
                    .collect()
            }
        };
        stream::iter(chunks).boxed()
    }

    async fn finalized_height(&self, hash: B256) -> Result<u64, ProviderError> {
        let inner = self.inner.lock().unwrap();
        inner.by_hash.get(&hash).map(Block::height).ok_or_else(|| ProviderError::BlockNotFound {
            reference: format!("({hash})"),
        })
    }
}

/// Builds a parent-linked canonical chain `base..=top` from labels
/// `prefix{height}`.
pub(crate) fn labeled_chain(prefix: &str, base: u64, top: u64) -> Vec<TestBlock> {
    (base..=top)
        .map(|h| {
            TestBlock::linked(
                &format!("{prefix}{h}"),
                h,
                &format!("{prefix}{}", h.wrapping_sub(1)),
            )
        })
        .collect()
}
