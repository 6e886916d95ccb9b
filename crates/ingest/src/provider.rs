//! The chain provider contract.
//!
//! This is the seam where a real RPC/archive client plugs in; it is the only
//! place wire-protocol detail enters the ingestion core. Trust in the remote
//! node's answers is assumed up to the caller-side validation in
//! [`check_batch`][crate::check_batch] and friends.

use crate::ProviderError;
use alloy_primitives::B256;
use async_trait::async_trait;
use firth_types::{Block, BlockHeader, BlockRef};
use futures::stream::BoxStream;

/// A chain-specific adapter the ingestion engines fetch blocks through.
///
/// Every method may fail with a network error (propagated unchanged) or return
/// a result inconsistent with a prior call, which the engines surface as a
/// consistency error.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// The chain-specific block payload.
    type Block: Block + Clone + 'static;

    /// The chain-specific per-range request payload describing what data to
    /// fetch with each block. Opaque to the engines.
    type Request: Send + Sync + 'static;

    /// The header of the most recently finalized block.
    async fn finalized_head(&self) -> Result<BlockHeader, ProviderError>;

    /// Fetches exactly one block. The result must carry a header at minimum.
    async fn block(
        &self,
        reference: &BlockRef,
        request: Option<&Self::Request>,
    ) -> Result<Self::Block, ProviderError>;

    /// Fetches a contiguous ascending range of blocks ending at a known block,
    /// delivered in sub-batches.
    ///
    /// When `from` lies above `to`, implementations must coerce the request to
    /// a single-block result (just the `to` block, so a same-height reorg is
    /// still observable) or, for height-only `to` references below `from`, an
    /// empty one.
    fn block_range<'a>(
        &'a self,
        from: u64,
        to: BlockRef,
        request: Option<&'a Self::Request>,
    ) -> BoxStream<'a, Result<Vec<Self::Block>, ProviderError>>;

    /// Resolves a finalized block hash to its height. Used when a head
    /// notification carried only a hash.
    async fn finalized_height(&self, hash: B256) -> Result<u64, ProviderError>;
}
