use crate::{types::OperationKey, QueryError};
use serde::Serialize;
use std::num::Wrapping;

/// djb2 over the bytes of a string. Used to seed operation keys with the endpoint name.
pub fn hash_str(s: &str) -> u32 {
    let mut h = Wrapping(5381u32);
    for byte in s.bytes() {
        h = (h << 5) + h + Wrapping(byte as u32);
    }
    h.0
}

/// When we have separate values it's useful to run a progressive
/// version of djb2 where we pretend that we're still looping over
/// the same value
pub fn progressive_hash(h: u32, bytes: &[u8]) -> u64 {
    let mut h = Wrapping(h as u64);

    for byte in bytes {
        h = (h << 5) + h + Wrapping(*byte as u64)
    }

    h.0
}

/// The cache key for an endpoint called with `args`.
pub fn operation_key<V: Serialize>(
    endpoint: &'static str,
    args: &V
) -> Result<OperationKey, QueryError> {
    let args = bincode::serialize(args)?;
    Ok(OperationKey::new(endpoint, args))
}
