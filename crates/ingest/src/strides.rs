//! Splitting a block-range request into fetch-sized strides.

use firth_types::HashAndHeight;

/// One sub-range of a larger block-range request, sized for a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stride {
    /// The first block height of the stride.
    pub from: u64,
    /// The last block height of the stride.
    pub to: u64,
    /// Set on the stride that reaches the currently known chain top, carrying
    /// the top block so the fetch can target it instead of re-resolving the
    /// head.
    pub head: Option<HashAndHeight>,
}

/// Divides `[beg, min(top.height, end)]` into consecutive strides of
/// `stride_size` heights, the last one clipped.
///
/// Never produces zero-length or overlapping strides; an empty window yields
/// nothing. The stride whose `to` equals the known top height is tagged with
/// the top block.
pub fn split_strides(
    stride_size: u64,
    beg: u64,
    end: Option<u64>,
    top: &HashAndHeight,
) -> Vec<Stride> {
    let stride_size = stride_size.max(1);
    let bound = end.map_or(top.height, |e| e.min(top.height));
    if beg > bound {
        return Vec::new();
    }

    let mut strides = Vec::with_capacity(((bound - beg) / stride_size + 1) as usize);
    let mut from = beg;
    while from <= bound {
        let to = bound.min(from + stride_size - 1);
        let head = (to == top.height).then(|| top.clone());
        strides.push(Stride { from, to, head });
        from = to + 1;
    }
    strides
}
