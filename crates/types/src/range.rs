//! Block range requests.

use thiserror::Error;

/// An inclusive block height range. `to: None` means "open-ended, follow the head".
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Range {
    /// The first block height of the range.
    pub from: u64,
    /// The last block height of the range, or `None` for an open-ended range.
    pub to: Option<u64>,
}

impl Range {
    /// Creates a bounded range.
    pub const fn new(from: u64, to: u64) -> Self {
        Self { from, to: Some(to) }
    }

    /// Creates an open-ended range.
    pub const fn open(from: u64) -> Self {
        Self { from, to: None }
    }

    /// Returns `true` if the range contains no heights.
    pub fn is_empty(&self) -> bool {
        self.to.is_some_and(|to| to < self.from)
    }
}

/// A block range plus an opaque per-range request payload describing what data
/// to fetch for blocks in that range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest<R> {
    /// The block range to fetch.
    pub range: Range,
    /// The chain-specific request payload, opaque to the engine.
    pub request: R,
}

impl<R> RangeRequest<R> {
    /// Creates a new [`RangeRequest`].
    pub const fn new(range: Range, request: R) -> Self {
        Self { range, request }
    }
}

/// A [`RangeRequestList`] was not ascending and non-overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("range starting at {from} does not come strictly after the previous range")]
pub struct RangeOrderError {
    /// The start of the offending range.
    pub from: u64,
}

/// An ordered, non-overlapping, ascending sequence of [`RangeRequest`]s.
///
/// This ordering is a hard sequencing contract: the cold ingest engine consumes
/// the list strictly in order, moving to the next request only once the
/// previous one's range is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequestList<R>(Vec<RangeRequest<R>>);

impl<R> RangeRequestList<R> {
    /// Validates and wraps an ordered request list.
    ///
    /// Every range must start strictly above the previous range's end, empty
    /// ranges are rejected, and only the last range may be open-ended.
    pub fn new(requests: Vec<RangeRequest<R>>) -> Result<Self, RangeOrderError> {
        let mut prev_end: Option<u64> = None;
        for req in &requests {
            let ordered = match prev_end {
                None => true,
                // A previous open-ended range swallows everything above it.
                Some(u64::MAX) => false,
                Some(end) => req.range.from > end,
            };
            if !ordered || req.range.is_empty() {
                return Err(RangeOrderError { from: req.range.from });
            }
            prev_end = Some(req.range.to.unwrap_or(u64::MAX));
        }
        Ok(Self(requests))
    }

    /// Creates a list holding a single request.
    pub fn single(range: Range, request: R) -> Self {
        Self(vec![RangeRequest::new(range, request)])
    }

    /// The requests, in ascending range order.
    pub fn requests(&self) -> &[RangeRequest<R>] {
        &self.0
    }

    /// Returns `true` if the list holds no requests.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<R> IntoIterator for RangeRequestList<R> {
    type Item = RangeRequest<R>;
    type IntoIter = std::vec::IntoIter<RangeRequest<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
