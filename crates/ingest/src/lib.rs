//! The chain-ingestion core shared by per-chain indexing SDKs.
//!
//! Two independent pipelines turn a remote chain node's RPC interface into an
//! ordered, consistency-checked stream for downstream mapping code:
//!
//! - [`ColdIngest`] fetches a bounded historical range of already-finalized
//!   blocks with concurrent, ordered, rate-aware requests and yields
//!   [`Batch`][firth_types::Batch]es.
//! - [`HotProcessor`] tracks the unconfirmed tip of a live chain, reconciles
//!   reorgs against a short in-memory window, and emits
//!   [`HotUpdate`][firth_types::HotUpdate]s describing which blocks are newly
//!   canonical.
//!
//! Both sit on top of a chain-specific [`ChainProvider`] and share the
//! [`Throttler`] and [`OrderedPipeline`] primitives. The engine never decodes
//! or stores a block's domain fields; those stay opaque behind the provider's
//! request payload and the caller's sink.

mod error;
pub use error::{IngestError, ProviderError};

mod provider;
pub use provider::ChainProvider;

mod throttler;
pub use throttler::Throttler;

mod pipeline;
pub use pipeline::OrderedPipeline;

mod strides;
pub use strides::{Stride, split_strides};

mod validate;
pub use validate::{check_batch, check_continuity};

mod cold;
pub use cold::{ColdIngest, ColdIngestConfig};

mod hot;
pub use hot::{HotProcessor, UpdateSink};

#[cfg(test)]
mod test_utils;
