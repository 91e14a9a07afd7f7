//! Cache module for Redis-backed token state
//!
//! This module provides the Redis client (retry logic, per-operation
//! deadlines, scripted compare-and-swap) and the [`KeyValueStore`]
//! implementation the core services run on.
//!
//! [`KeyValueStore`]: sg_core::KeyValueStore

pub mod redis_client;
pub mod redis_store;

#[cfg(test)]
mod tests;

pub use redis_client::RedisClient;
pub use redis_store::RedisKeyValueStore;

// Re-export commonly used types
pub use sg_shared::config::CacheConfig;
