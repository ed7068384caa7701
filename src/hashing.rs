//! Deterministic hashing. The standard library `HashMap` is randomly seeded per process, which
//! would make anything that iterates a map differ between runs with the same seed. The
//! `HashMap` re-exported here uses `rustc-hash` and is stable across runs.
//!
//! `HashMap<K, V, S>` has no `new` method with a custom hasher; use `HashMap::default()`.
//!
//! The `hash_str` free function is used to derive per-stream seeds in `crate::random`.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::FxHashMap as HashMap;

/// A convenience method to compute a stable hash of a `&str`.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
