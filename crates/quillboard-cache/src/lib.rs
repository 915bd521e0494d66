// In-memory TTL caching layer
// Keeps repeat API calls down without dragging in a database

pub mod cache;

pub use cache::{CacheError, MemoryCache};
