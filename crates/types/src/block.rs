//! Block identification primitives.

use alloy_primitives::B256;
use thiserror::Error;

/// An unambiguous reference to a single block.
///
/// Within one chain window, `height` strictly increases with position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct HashAndHeight {
    /// The block hash.
    pub hash: B256,
    /// The block height.
    pub height: u64,
}

impl HashAndHeight {
    /// Creates a new [`HashAndHeight`].
    pub const fn new(hash: B256, height: u64) -> Self {
        Self { hash, height }
    }
}

impl core::fmt::Display for HashAndHeight {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{} ({})", self.height, self.hash)
    }
}

/// A relaxed block reference where either the hash or the height may be absent.
///
/// Used when only partial identification is available, e.g. before a finalized
/// hash has been resolved to a height. At least one of the two fields is always
/// present (enforced by the constructors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    hash: Option<B256>,
    height: Option<u64>,
}

impl BlockRef {
    /// Creates a hash-only reference.
    pub const fn from_hash(hash: B256) -> Self {
        Self { hash: Some(hash), height: None }
    }

    /// Creates a height-only reference.
    pub const fn from_height(height: u64) -> Self {
        Self { hash: None, height: Some(height) }
    }

    /// Creates a fully resolved reference.
    pub const fn from_parts(hash: B256, height: u64) -> Self {
        Self { hash: Some(hash), height: Some(height) }
    }

    /// The hash, when known.
    pub const fn hash(&self) -> Option<B256> {
        self.hash
    }

    /// The height, when known.
    pub const fn height(&self) -> Option<u64> {
        self.height
    }

    /// Returns `true` if this reference identifies the given block.
    ///
    /// Compares by hash when the hash is known, otherwise by height.
    pub fn matches(&self, block: &HashAndHeight) -> bool {
        match (self.hash, self.height) {
            (Some(hash), _) => hash == block.hash,
            (None, Some(height)) => height == block.height,
            (None, None) => false,
        }
    }
}

impl From<HashAndHeight> for BlockRef {
    fn from(value: HashAndHeight) -> Self {
        Self::from_parts(value.hash, value.height)
    }
}

impl From<&HashAndHeight> for BlockRef {
    fn from(value: &HashAndHeight) -> Self {
        Self::from_parts(value.hash, value.height)
    }
}

impl core::fmt::Display for BlockRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match (self.hash, self.height) {
            (Some(hash), Some(height)) => write!(f, "#{height} ({hash})"),
            (Some(hash), None) => write!(f, "({hash})"),
            (None, Some(height)) => write!(f, "#{height}"),
            (None, None) => write!(f, "(unresolved)"),
        }
    }
}

/// The minimal header every ingested block carries.
///
/// Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// The block hash.
    pub hash: B256,
    /// The block height.
    pub height: u64,
    /// The hash of the parent block.
    pub parent_hash: B256,
}

impl BlockHeader {
    /// Creates a new [`BlockHeader`].
    pub const fn new(hash: B256, height: u64, parent_hash: B256) -> Self {
        Self { hash, height, parent_hash }
    }

    /// The `{hash, height}` pair identifying this block.
    pub const fn as_pair(&self) -> HashAndHeight {
        HashAndHeight { hash: self.hash, height: self.height }
    }
}

/// The capability the ingestion engines require of a chain-specific block payload.
///
/// The engines only ever look at the projected [`BlockHeader`]; everything else
/// about the payload is opaque and flows through untouched.
pub trait Block: Send + Sync {
    /// The common header projected out of this block.
    fn header(&self) -> &BlockHeader;

    /// A consistency marker set by an upstream field-fetch step that discovered
    /// the block vanished or mismatched between two calls (e.g. due to an
    /// intervening reorg). Marked blocks fail batch validation.
    fn invalid_reason(&self) -> Option<&str> {
        None
    }

    /// The block hash.
    fn hash(&self) -> B256 {
        self.header().hash
    }

    /// The block height.
    fn height(&self) -> u64 {
        self.header().height
    }

    /// The parent block hash.
    fn parent_hash(&self) -> B256 {
        self.header().parent_hash
    }
}

/// A block returned by the chain no longer matches previously observed reality.
///
/// Fatal to the batch it was found in; retry policy belongs to the RPC layer
/// underneath the chain provider, never to the ingestion core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("inconsistent block {reference}: {reason}")]
pub struct BlockConsistencyError {
    /// The offending block.
    pub reference: String,
    /// Why the block was rejected.
    pub reason: String,
}

impl BlockConsistencyError {
    /// Creates a new [`BlockConsistencyError`] naming the offending block.
    pub fn new(reference: impl core::fmt::Display, reason: impl Into<String>) -> Self {
        Self { reference: reference.to_string(), reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> B256 {
        B256::repeat_byte(byte)
    }

    #[test]
    fn block_ref_matches_by_hash_when_present() {
        let block = HashAndHeight::new(hash(1), 10);
        assert!(BlockRef::from_hash(hash(1)).matches(&block));
        // Hash wins over a conflicting height.
        assert!(BlockRef::from_parts(hash(1), 99).matches(&block));
        assert!(!BlockRef::from_hash(hash(2)).matches(&block));
    }

    #[test]
    fn block_ref_matches_by_height_when_hash_absent() {
        let block = HashAndHeight::new(hash(1), 10);
        assert!(BlockRef::from_height(10).matches(&block));
        assert!(!BlockRef::from_height(11).matches(&block));
    }

    #[test]
    fn header_projects_pair() {
        let header = BlockHeader::new(hash(3), 7, hash(2));
        assert_eq!(header.as_pair(), HashAndHeight::new(hash(3), 7));
    }
}
