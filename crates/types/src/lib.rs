//! Core data model shared by the firth ingestion pipelines.
//!
//! This crate defines how blocks are identified ([`HashAndHeight`], [`BlockRef`],
//! [`BlockHeader`]), how a chain-specific block payload is projected into the
//! common header shape (the [`Block`] trait), and the range/batch vocabulary the
//! cold and hot ingestion engines speak ([`RangeRequest`], [`Batch`],
//! [`HotState`], [`HotUpdate`]).

mod block;
pub use block::{Block, BlockConsistencyError, BlockHeader, BlockRef, HashAndHeight};

mod range;
pub use range::{Range, RangeOrderError, RangeRequest, RangeRequestList};

mod batch;
pub use batch::Batch;

mod hot;
pub use hot::{ChainHeads, HotState, HotUpdate};
