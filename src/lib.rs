//! # simcache
//!
//! Sharded, thread-safe, in-process cache with similarity-based lookup.
//!
//! When an exact lookup misses, [`Cache::get_similar`] can return the
//! stored entry whose key is closest to the query under a caller-supplied
//! similarity function, provided the score clears a configured threshold.
//! Entries carry optional time-to-live expiry, capacity is bounded through
//! pluggable eviction policies, and an ambient [`Context`] threads
//! namespace partitioning, metadata and cancellation through every call.
//!
//! ## Example
//!
//! ```rust
//! use simcache::prelude::*;
//!
//! let cache: Cache<String, String> = Cache::builder()
//!     .threshold(0.7)
//!     .build()
//!     .with_similarity(|a: &String, b: &String| levenshtein(a, b));
//!
//! let ctx = Context::background();
//! cache.set(&ctx, "hello".into(), "world".into()).unwrap();
//!
//! // "helo" is one edit away from "hello": similarity 0.8.
//! let found = cache.get_similar(&ctx, &"helo".into()).unwrap();
//! assert_eq!(found.key, "hello");
//! assert_eq!(found.value, "world");
//! ```
//!
//! ## Concurrency
//!
//! Every shard owns a read-write lock; operations on keys in different
//! shards proceed in parallel, and there is no cache-wide lock. Eviction
//! policies are shared across shards and synchronize internally. Long
//! similarity scans poll the context's cancellation signal between
//! candidates and between shards.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod context;
pub mod distance;
pub mod entry;
pub mod error;
pub mod eviction;
pub mod options;
pub mod similarity;
pub mod stats;

mod shard;

pub use cache::{Cache, SimilarMatch};
pub use context::{CancelHandle, Context};
pub use error::{CacheError, Result};

/// Common imports for convenient usage
pub mod prelude {
    pub use crate::cache::{Cache, SimilarMatch};
    pub use crate::context::{CancelHandle, Context, MetadataValue};
    pub use crate::distance::{
        damerau_levenshtein, euclidean, hamming, hamming_bytes, levenshtein, manhattan,
    };
    pub use crate::error::{CacheError, Result};
    pub use crate::eviction::{CombinedPolicy, EvictionPolicy, Lru, TtlPolicy};
    pub use crate::options::CacheBuilder;
    pub use crate::similarity::{FnSimilarity, Similarity, SimilarityFn};
    pub use crate::stats::Stats;
}
