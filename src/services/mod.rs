// Service exports
pub mod cache;
pub mod listings;
pub mod postgres;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use listings::{ListingStoreClient, ListingStoreError, ListingTables};
pub use postgres::{PostgresError, ScoreStore, StoredScore};
