//! Concurrency-bounded ordered mapping of a work stream.

use futures::{
    Stream, StreamExt,
    stream::FuturesOrdered,
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

/// Runs up to `concurrency` mapping operations over an ordered input stream
/// while delivering results in input order.
///
/// This is an ordered map, not a fan-in: completion order may differ, delivery
/// order never does. The pipeline pulls no more than `concurrency` items ahead
/// of the slowest unconsumed result, so the consumer's poll rate governs the
/// producer's. Dropping the pipeline abandons all in-flight futures.
#[derive(Debug)]
pub struct OrderedPipeline<S, F, Fut>
where
    Fut: Future,
{
    input: S,
    map: F,
    concurrency: usize,
    in_flight: FuturesOrdered<Fut>,
    input_done: bool,
}

impl<S, F, Fut> OrderedPipeline<S, F, Fut>
where
    S: Stream + Unpin,
    F: FnMut(S::Item) -> Fut + Unpin,
    Fut: Future,
{
    /// Creates a new pipeline.
    ///
    /// # Panics
    ///
    /// Panics if `concurrency` is zero.
    pub fn new(input: S, concurrency: usize, map: F) -> Self {
        assert!(concurrency >= 1, "pipeline concurrency must be at least 1");
        Self { input, map, concurrency, in_flight: FuturesOrdered::new(), input_done: false }
    }
}

impl<S, F, Fut> Stream for OrderedPipeline<S, F, Fut>
where
    S: Stream + Unpin,
    F: FnMut(S::Item) -> Fut + Unpin,
    Fut: Future,
{
    type Item = Fut::Output;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // Top up the in-flight window from the input.
        while !this.input_done && this.in_flight.len() < this.concurrency {
            match Pin::new(&mut this.input).poll_next(cx) {
                Poll::Ready(Some(item)) => this.in_flight.push_back((this.map)(item)),
                Poll::Ready(None) => this.input_done = true,
                Poll::Pending => break,
            }
        }

        match this.in_flight.poll_next_unpin(cx) {
            Poll::Ready(Some(output)) => Poll::Ready(Some(output)),
            Poll::Ready(None) if this.input_done => Poll::Ready(None),
            // Nothing in flight yet, input still pending.
            Poll::Ready(None) | Poll::Pending => Poll::Pending,
        }
    }
}
