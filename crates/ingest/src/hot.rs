//! Hot chain reconciliation: tracking the unconfirmed tip of a live chain.

use crate::{ChainProvider, IngestError, check_continuity};
use async_trait::async_trait;
use firth_types::{
    Block, BlockConsistencyError, BlockRef, ChainHeads, HashAndHeight, HotState, HotUpdate,
};
use futures::StreamExt;
use std::{collections::VecDeque, sync::Arc};
use tracing::{debug, info};

/// The caller-side consumer of [`HotUpdate`]s.
///
/// The processor awaits every delivery before advancing, so backpressure flows
/// from the sink back into the fetch pipeline.
#[async_trait]
pub trait UpdateSink<B>: Send {
    /// Handles one reconciliation update.
    async fn on_update(
        &mut self,
        update: HotUpdate<B>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait]
impl<B: Send + 'static> UpdateSink<B> for tokio::sync::mpsc::Sender<HotUpdate<B>> {
    async fn on_update(
        &mut self,
        update: HotUpdate<B>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.send(update).await.map_err(|_| "update channel closed".into())
    }
}

/// A pure state machine over a short in-memory window of `(hash, height)`
/// pairs running from the last finalized point to the current best tip.
///
/// On each observed `(best, finalized)` head pair, [`goto`][Self::goto]
/// reconciles the window against the remote chain, fetching only the blocks it
/// does not already know, and emits updates describing which blocks are newly
/// canonical versus retracted. Once blocks become finalized the window is
/// trimmed past them.
///
/// `goto` calls must be issued serially; the processor is not reentrant.
pub struct HotProcessor<P: ChainProvider, S> {
    provider: Arc<P>,
    sink: S,
    state: HotState,
    request: Option<P::Request>,
}

impl<P: ChainProvider, S> core::fmt::Debug for HotProcessor<P, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HotProcessor").field("state", &self.state).finish_non_exhaustive()
    }
}

impl<P, S> HotProcessor<P, S>
where
    P: ChainProvider,
    S: UpdateSink<P::Block>,
{
    /// Creates a processor resuming from previously persisted state.
    pub const fn new(provider: Arc<P>, state: HotState, sink: S) -> Self {
        Self { provider, sink, state, request: None }
    }

    /// Creates a processor starting from the current finalized head with an
    /// empty window.
    pub async fn from_finalized(provider: Arc<P>, sink: S) -> Result<Self, IngestError> {
        let head = provider.finalized_head().await?;
        Ok(Self::new(provider, HotState::new(head.as_pair()), sink))
    }

    /// Attaches a chain-specific request payload to every block fetch.
    pub fn with_request(mut self, request: P::Request) -> Self {
        self.request = Some(request);
        self
    }

    /// The current chain window. Persist this to resume tracking later.
    pub const fn state(&self) -> &HotState {
        &self.state
    }

    /// Reconciles the chain window against a newly observed head pair,
    /// delivering zero or more updates to the sink.
    ///
    /// A head pair the window already satisfies is a no-op, so repeated or
    /// stale notifications are safe.
    pub async fn goto(&mut self, heads: ChainHeads) -> Result<(), IngestError> {
        if self.state.contains(&heads.best) {
            return Ok(());
        }
        debug!(
            target: "hot_processor",
            best = %heads.best,
            finalized = %heads.finalized,
            head = %self.state.head(),
            "reconciling chain window"
        );

        let provider = self.provider.clone();
        let request = self.request.as_ref();
        let from = self.state.head().height + 1;
        let mut emitted = false;

        let mut chunks = provider.block_range(from, heads.best.clone(), request);
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            check_continuity(None, &chunk)?;

            // The window as a contiguous arena, oldest at index 0.
            let mut chain = window_vec(&self.state);
            let mut new_blocks: VecDeque<P::Block> = chunk.into();

            // Walk backward from the batch's declared parent until it
            // reattaches to the window, popping superseded entries and
            // fetching one ancestor per step. Bounded only by fork depth.
            let mut popped = 0u64;
            let base_head = loop {
                let first =
                    new_blocks.front().expect("reattachment walk always holds at least one block");
                let first_pair = first.header().as_pair();
                let base = chain.first().cloned().expect("window always retains its base");
                let Some(parent_height) =
                    first.height().checked_sub(1).filter(|ph| *ph >= base.height)
                else {
                    return Err(IngestError::ReorgBelowBase { base, block: first_pair });
                };
                let idx = (parent_height - base.height) as usize;
                let Some(entry) = chain.get(idx) else {
                    return Err(BlockConsistencyError::new(
                        first_pair,
                        "sub-batch does not extend the chain window",
                    )
                    .into());
                };
                if entry.hash == first.parent_hash() {
                    let anchor = entry.clone();
                    chain.truncate(idx + 1);
                    break anchor;
                }
                if idx == 0 {
                    // The batch claims a different block at the base's own
                    // height; the finalized base cannot be popped.
                    return Err(IngestError::ReorgBelowBase { base, block: first_pair });
                }
                // Superseded by the reorg: drop the entry, fetch its
                // replacement's ancestor.
                chain.truncate(idx);
                popped += 1;
                let parent_ref = BlockRef::from_parts(first.parent_hash(), parent_height);
                let ancestor = provider.block(&parent_ref, request).await?;
                if ancestor.height() != parent_height || ancestor.hash() != first.parent_hash() {
                    return Err(BlockConsistencyError::new(
                        ancestor.header().as_pair(),
                        format!("ancestor fetch for {parent_ref} returned a different block"),
                    )
                    .into());
                }
                new_blocks.push_front(ancestor);
            };
            if popped > 0 {
                info!(
                    target: "hot_processor",
                    depth = popped,
                    anchor = %base_head,
                    "chain reorganized, reattached below the old tip"
                );
            }

            for block in &new_blocks {
                chain.push(block.header().as_pair());
            }

            let finalized_idx =
                resolve_finalized(provider.as_ref(), &chain, &heads.finalized).await?;
            let finalized_head = chain[finalized_idx].clone();

            // Blocks at or below the finalized cutoff can no longer be
            // reorganized away; drop them from the window. The window only
            // advances once the sink has accepted the blocks, so a failed
            // delivery can be retried from the same state.
            let next = HotState {
                hash: finalized_head.hash,
                height: finalized_head.height,
                top: chain[finalized_idx + 1..].to_vec(),
            };
            let update =
                HotUpdate { blocks: new_blocks.into(), base_head, finalized_head };
            self.sink.on_update(update).await.map_err(IngestError::Sink)?;
            self.state = next;
            emitted = true;
        }
        drop(chunks);

        if !emitted {
            self.finalize_only(&heads).await?;
        }
        Ok(())
    }

    /// Handles a head pair whose range fetch produced nothing new: the
    /// finalized cutoff may still have advanced, which is worth an update of
    /// its own (with an empty block list).
    async fn finalize_only(&mut self, heads: &ChainHeads) -> Result<(), IngestError> {
        let chain = window_vec(&self.state);
        let finalized_idx =
            resolve_finalized(self.provider.as_ref(), &chain, &heads.finalized).await?;
        if finalized_idx == 0 {
            return Ok(());
        }
        let finalized_head = chain[finalized_idx].clone();
        debug!(
            target: "hot_processor",
            finalized = %finalized_head,
            "pure finalization advance"
        );
        let next = HotState {
            hash: finalized_head.hash,
            height: finalized_head.height,
            top: chain[finalized_idx + 1..].to_vec(),
        };
        let update = HotUpdate { blocks: Vec::new(), base_head: next.head(), finalized_head };
        self.sink.on_update(update).await.map_err(IngestError::Sink)?;
        self.state = next;
        Ok(())
    }
}

fn window_vec(state: &HotState) -> Vec<HashAndHeight> {
    let mut chain = Vec::with_capacity(state.top.len() + 1);
    chain.push(state.base());
    chain.extend(state.top.iter().cloned());
    chain
}

/// Resolves a finalized head reference to an index into the chain window.
///
/// Hash-only references are resolved against the window first, falling back to
/// the provider's height-by-hash lookup. A finalized point at or below the
/// retained base clamps to the base (nothing left to trim); one above the
/// window head clamps to the head, so finality that outruns the fetched blocks
/// is applied as far as the window reaches and the remainder deferred. The
/// hash is asserted only when its height falls inside the window; a
/// contradiction there is fatal, since the node's finality claim disagrees
/// with locally observed history.
async fn resolve_finalized<P: ChainProvider>(
    provider: &P,
    chain: &[HashAndHeight],
    finalized: &BlockRef,
) -> Result<usize, IngestError> {
    let height = match finalized.height() {
        Some(height) => height,
        None => {
            let hash = match finalized.hash() {
                Some(hash) => hash,
                None => {
                    return Err(IngestError::BadFinalizedRef { reference: finalized.to_string() });
                }
            };
            match chain.iter().find(|entry| entry.hash == hash) {
                Some(entry) => entry.height,
                None => provider.finalized_height(hash).await?,
            }
        }
    };

    let base = &chain[0];
    if height <= base.height {
        return Ok(0);
    }
    // A finalized point past the retained head covers every block currently
    // held, since they all sit on the path to `best` at lower heights; clamp
    // to the head and let later fetches trim further.
    let idx = ((height - base.height) as usize).min(chain.len() - 1);
    let entry = &chain[idx];
    if let Some(hash) = finalized.hash() {
        if entry.height == height && entry.hash != hash {
            return Err(IngestError::FinalityMismatch { height, claimed: hash, held: entry.hash });
        }
    }
    Ok(idx)
}
