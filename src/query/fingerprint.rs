//! Short stable digests for canonicalized queries.
//!
//! The digest is a cache and telemetry grouping key, not an integrity
//! guarantee: a DJB2-style rolling hash over the canonical encoding, masked
//! to 32 bits and hex-encoded. Two queries that canonicalize identically
//! always share a digest; distinct queries collide only at the odds a
//! 32-bit hash affords.

use crate::query::ast::Query;
use crate::query::canonical::{canonicalize, query_sort_key};

/// Digest of the query's canonical form: 8 lowercase hex characters.
pub fn fingerprint(query: &Query) -> String {
    digest(&query_sort_key(&canonicalize(query)))
}

/// DJB2 rolling hash of arbitrary text, rendered as 8 lowercase hex
/// characters.
///
/// Also used by the drift tooling to digest execution-plan dumps, so both
/// sides of a drift comparison share one fingerprint format.
pub fn digest(input: &str) -> String {
    let mut hash: u32 = 5381;
    for byte in input.bytes() {
        hash = hash.wrapping_mul(33) ^ u32::from(byte);
    }
    format!("{hash:08x}")
}
