//! Bijective encoding of an unordered image pair into a single `pair_id`,
//! as used by the `matches` and `two_view_geometries` tables.

use crate::error::{Error, Result};

/// Exclusive upper bound on image ids that can take part in a pair.
pub const MAX_IMAGE_ID: i64 = 2_147_483_647;

/// Encode two image ids into a pair id. Order does not matter.
///
/// Ids outside `0..MAX_IMAGE_ID` would collide with other pairs, so they are
/// rejected instead of wrapped.
pub fn encode_pair(id1: i64, id2: i64) -> Result<i64> {
    for id in [id1, id2] {
        if !(0..MAX_IMAGE_ID).contains(&id) {
            return Err(Error::PairEncodingOverflow(id));
        }
    }
    let (lo, hi) = if id1 > id2 { (id2, id1) } else { (id1, id2) };
    Ok(lo * MAX_IMAGE_ID + hi)
}

/// Decode a pair id into its two image ids, lower id first.
pub fn decode_pair(pair_id: i64) -> (i64, i64) {
    let id2 = pair_id.rem_euclid(MAX_IMAGE_ID);
    let id1 = (pair_id - id2) / MAX_IMAGE_ID;
    (id1, id2)
}
