//! Reference resolution
//!
//! - `fetcher.rs` - the options source supplied by the application
//! - `cache.rs` - TTL + LRU store of resolved collections
//! - `resolver.rs` - coalescing resolve, title lookups, invalidation

mod cache;
mod fetcher;
mod resolver;

pub use cache::{CacheEntry, CacheStats, ReferenceCache};
pub use fetcher::{OptionsFetcher, StaticOptions};
pub use resolver::ReferenceResolver;
