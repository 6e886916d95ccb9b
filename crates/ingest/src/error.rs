//! Error taxonomy of the ingestion core.
//!
//! Consistency errors are fatal to the batch they were found in; invariant
//! violations (broken parent linkage, finality contradictions) are fatal to the
//! whole ingestion session; transport errors propagate unchanged. A batch or
//! update is either fully valid or not emitted at all.

use alloy_primitives::B256;
use firth_types::{BlockConsistencyError, HashAndHeight};
use thiserror::Error;

/// Errors surfaced by a [`ChainProvider`][crate::ChainProvider].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A network or RPC transport failure, propagated unchanged. Retry policy
    /// belongs to the underlying RPC client, not to the ingestion core.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The requested block does not exist on the remote node.
    #[error("block {reference} not found")]
    BlockNotFound {
        /// The reference that could not be resolved.
        reference: String,
    },
}

impl ProviderError {
    /// Wraps an arbitrary transport-level failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }
}

/// Errors emitted by the cold ingest engine and the hot processor.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A chain provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A fetched block no longer matches previously observed reality.
    #[error(transparent)]
    Consistency(#[from] BlockConsistencyError),

    /// A fetched batch was not a contiguous parent-linked chain.
    #[error("broken chain: block {block} declares parent {parent}, expected {expected}")]
    BrokenChain {
        /// The block whose linkage is broken.
        block: HashAndHeight,
        /// The parent hash the block declares.
        parent: B256,
        /// The hash the previous block actually has.
        expected: B256,
    },

    /// The remote node's finality claim contradicts locally observed history.
    #[error("finalized block mismatch at height {height}: node claims {claimed}, window holds {held}")]
    FinalityMismatch {
        /// The finalized height in question.
        height: u64,
        /// The hash the node claims is finalized.
        claimed: B256,
        /// The hash the chain window holds at that height.
        held: B256,
    },

    /// A reorg walked below the finalized base of the chain window.
    #[error("reorg of block {block} reaches below the finalized base {base}")]
    ReorgBelowBase {
        /// The base of the chain window.
        base: HashAndHeight,
        /// The block whose ancestry left the window.
        block: HashAndHeight,
    },

    /// A finalized head reference could not be resolved against the window.
    #[error("finalized head {reference} cannot be resolved within the chain window")]
    BadFinalizedRef {
        /// The unresolvable reference.
        reference: String,
    },

    /// The caller-side update sink failed; backpressure turns this into an
    /// ingestion failure.
    #[error("update sink error: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}
