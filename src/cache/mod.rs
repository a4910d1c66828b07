//! On-disk thumbnail cache.
//!
//! - `key` - Deterministic `CacheKey` derivation from (path, mtime, page)
//! - `store` - Flat directory of `<key>.png` records with JSON sidecars
//!
//! Only the thumbnail worker writes through `CacheStore`; the UI thread
//! may read it on the fast path.

mod key;
mod store;

pub use key::CacheKey;
pub use store::{CacheStore, CachedThumbnail, RecordMeta};
