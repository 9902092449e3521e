pub mod cache;
pub mod store;

pub use cache::{cache_key, CacheEntry, CacheStore, FileStamp, MemoryCacheStore};
pub use store::RedbCacheStore;
