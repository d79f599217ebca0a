pub mod base64;
pub mod cache;
pub mod file;
pub mod http;
pub mod matcher;
pub mod url;

// Re-export common utilities
pub use cache::{CacheStore, FileCacheStore, MemoryCacheStore, SubscriptionLoader};
pub use http::{Fetcher, HttpFetcher};
pub use matcher::NameRules;
