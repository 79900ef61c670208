pub mod postgres;
pub mod redis;
pub mod sessions;

pub use postgres::create_pool;
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use sessions::SessionStore;
