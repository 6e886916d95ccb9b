//! Cold range ingestion: bulk fetching of already-finalized block ranges.

use crate::{
    ChainProvider, IngestError, OrderedPipeline, Throttler, check_batch, split_strides,
};
use async_stream::try_stream;
use firth_types::{Batch, Block, BlockRef, RangeRequestList};
use futures::{Stream, StreamExt, stream};
use std::{sync::Arc, time::Duration};
use tracing::debug;

/// Tuning knobs of the cold ingest engine.
#[derive(Debug, Clone)]
pub struct ColdIngestConfig {
    /// Heights per stride, i.e. per range-fetch request.
    pub stride_size: u64,
    /// Maximum number of stride fetches in flight.
    pub concurrency: usize,
    /// Minimum interval between finalized-head polls.
    pub head_poll_interval: Duration,
}

impl Default for ColdIngestConfig {
    fn default() -> Self {
        Self { stride_size: 10, concurrency: 5, head_poll_interval: Duration::from_secs(5) }
    }
}

/// Fetches bounded historical ranges of finalized blocks as fast as the remote
/// node allows: the finalized head is polled through a [`Throttler`], each
/// caught-up window is split into strides, and strides are fetched through an
/// [`OrderedPipeline`] so batches come out strictly in range order.
#[derive(Debug)]
pub struct ColdIngest<P> {
    provider: Arc<P>,
    config: ColdIngestConfig,
}

impl<P> ColdIngest<P>
where
    P: ChainProvider + 'static,
{
    /// Creates a new cold ingest engine over the given provider.
    pub const fn new(provider: Arc<P>, config: ColdIngestConfig) -> Self {
        Self { provider, config }
    }

    /// Streams ordered batches covering `requests`, strictly in list order.
    ///
    /// With `stop_on_head` set, a bounded request ends as soon as ingestion
    /// catches up with the finalized head; an open-ended request follows the
    /// head forever regardless. The stream is driven by the consumer: dropping
    /// it abandons all in-flight fetches.
    pub fn ingest(
        &self,
        requests: RangeRequestList<P::Request>,
        stop_on_head: bool,
    ) -> impl Stream<Item = Result<Batch<P::Block>, IngestError>> + Send + 'static {
        let provider = self.provider.clone();
        let config = self.config.clone();

        try_stream! {
            let head_source = {
                let provider = provider.clone();
                move || {
                    let provider = provider.clone();
                    async move { provider.finalized_head().await }
                }
            };
            let throttler = Throttler::new(config.head_poll_interval, head_source);

            for req in requests {
                let request = Arc::new(req.request);
                let mut beg = req.range.from;
                let end = req.range.to;

                'range: while end.is_none_or(|e| beg <= e) {
                    // The only busy-poll point; it backs off at the
                    // throttler's interval.
                    let mut top = throttler.get().await?;
                    while top.height < beg {
                        if stop_on_head && end.is_some() {
                            debug!(
                                target: "cold_ingest",
                                beg,
                                top = top.height,
                                "caught up with the finalized head, stopping"
                            );
                            break 'range;
                        }
                        top = throttler.refresh().await?;
                    }

                    let top = top.as_pair();
                    let strides = split_strides(config.stride_size, beg, end, &top);
                    debug!(
                        target: "cold_ingest",
                        from = beg,
                        top = top.height,
                        strides = strides.len(),
                        "fetching window"
                    );

                    let mut batches = OrderedPipeline::new(
                        stream::iter(strides),
                        config.concurrency,
                        |stride| {
                            let provider = provider.clone();
                            let request = request.clone();
                            async move {
                                let is_head = stride.head.is_some();
                                let to_ref = match stride.head {
                                    // The top block is already known; fetch
                                    // towards it instead of re-resolving the
                                    // head.
                                    Some(head) => BlockRef::from(head),
                                    None => BlockRef::from_height(stride.to),
                                };
                                let mut chunks = provider.block_range(
                                    stride.from,
                                    to_ref,
                                    Some(request.as_ref()),
                                );
                                let mut blocks =
                                    Vec::with_capacity((stride.to - stride.from + 1) as usize);
                                while let Some(chunk) = chunks.next().await {
                                    blocks.extend(chunk?);
                                }
                                check_batch(&blocks, stride.from, stride.to)?;
                                Ok::<_, IngestError>(Batch::new(blocks, is_head))
                            }
                        },
                    );

                    while let Some(batch) = batches.next().await {
                        let batch = batch?;
                        if let Some(last) = batch.blocks.last() {
                            beg = last.height() + 1;
                        }
                        yield batch;
                    }
                }
            }
        }
    }
}
