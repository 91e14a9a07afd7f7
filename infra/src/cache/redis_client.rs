//! Redis client implementation
//!
//! This module provides a Redis client with retry logic, per-operation
//! deadlines and the byte-level operations the token store needs: values
//! with millisecond TTLs, TTL-bounded sets, prefix scans and an atomic
//! scripted compare-and-swap.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult, Script};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use sg_core::CasOutcome;
use sg_shared::config::CacheConfig;

use crate::InfrastructureError;

/// Swap `KEYS[1]` from `ARGV[1]` to `ARGV[2]` keeping its TTL.
/// Returns 1 when swapped, 0 on mismatch, -1 when the key is absent.
/// `KEEPTTL` needs Redis 6.0 or newer.
const COMPARE_AND_SWAP_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
  return -1
end
if current ~= ARGV[1] then
  return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'KEEPTTL')
return 1
"#;

/// Keys fetched per `SCAN` round trip
const SCAN_BATCH: usize = 200;

/// Upper bound on backoff between retries
const MAX_RETRY_DELAY_MS: u64 = 5000;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Redis client with retry logic and per-operation deadlines
///
/// Cheap to clone; clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Maximum number of attempts for idempotent operations
    max_retries: u32,
    /// Base delay between retries (exponential backoff)
    retry_delay_ms: u64,
    /// Deadline for each single attempt
    response_timeout: Duration,
    cas_script: Script,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("response_timeout", &self.response_timeout)
            .finish()
    }
}

impl RedisClient {
    /// Connects to Redis
    ///
    /// # Arguments
    /// * `config` - Cache configuration settings
    ///
    /// # Returns
    /// * `Result<Self, InfrastructureError>` - Redis client or error
    ///
    /// # Example
    /// ```no_run
    /// use sg_infra::cache::RedisClient;
    /// use sg_shared::config::CacheConfig;
    ///
    /// async fn create_client() -> Result<RedisClient, Box<dyn std::error::Error>> {
    ///     let client = RedisClient::new(&CacheConfig::new("redis://localhost:6379")).await?;
    ///     Ok(client)
    /// }
    /// ```
    pub async fn new(config: &CacheConfig) -> Result<Self, InfrastructureError> {
        info!("Creating Redis client with URL: {}", mask_url(&config.url));

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection = Self::create_connection_with_retry(
            client,
            config.max_retries.max(1),
            config.retry_delay_ms,
            Duration::from_secs(config.connection_timeout.max(1)),
        )
        .await?;

        info!("Redis client created successfully");

        Ok(Self {
            connection,
            max_retries: config.max_retries.max(1),
            retry_delay_ms: config.retry_delay_ms,
            response_timeout: Duration::from_millis(config.response_timeout_ms.max(1)),
            cas_script: Script::new(COMPARE_AND_SWAP_SCRIPT),
        })
    }

    /// Create multiplexed connection with retry logic
    async fn create_connection_with_retry(
        client: Client,
        max_retries: u32,
        retry_delay_ms: u64,
        connect_timeout: Duration,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            let error = match timeout(connect_timeout, client.get_multiplexed_async_connection())
                .await
            {
                Ok(Ok(connection)) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Ok(Err(e)) => InfrastructureError::Cache(e),
                Err(_) => InfrastructureError::Timeout {
                    operation: "connect".to_string(),
                },
            };

            if attempts >= max_retries {
                error!(
                    "Failed to connect to Redis after {} attempts: {}",
                    attempts, error
                );
                return Err(error);
            }

            warn!(
                "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                attempts, max_retries, error, delay
            );
            sleep(Duration::from_millis(delay)).await;
            delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
        }
    }

    /// Get raw bytes
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, InfrastructureError> {
        debug!("Getting key '{}'", key);
        let key = key.to_string();
        self.execute_with_retry("GET", move |mut conn| {
            let key = key.clone();
            Box::pin(async move { conn.get::<_, Option<Vec<u8>>>(key).await })
        })
        .await
    }

    /// Set raw bytes with a millisecond-precision TTL
    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), InfrastructureError> {
        debug!("Setting key '{}' with expiry {}ms", key, ttl.as_millis());
        let key = key.to_string();
        let value = value.to_vec();
        let ttl_ms = ttl_millis(ttl);
        self.execute_with_retry("SET", move |mut conn| {
            let (key, value) = (key.clone(), value.clone());
            Box::pin(async move {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(ttl_ms)
                    .query_async::<_, ()>(&mut conn)
                    .await
            })
        })
        .await
    }

    /// Delete a key
    ///
    /// # Returns
    /// * `Result<bool, InfrastructureError>` - True if key was deleted, false if not found
    pub async fn delete(&self, key: &str) -> Result<bool, InfrastructureError> {
        debug!("Deleting key '{}'", key);
        let key = key.to_string();
        let deleted = self
            .execute_with_retry("DEL", move |mut conn| {
                let key = key.clone();
                Box::pin(async move { conn.del::<_, u32>(key).await })
            })
            .await?;
        Ok(deleted > 0)
    }

    /// Check if a key exists
    pub async fn exists(&self, key: &str) -> Result<bool, InfrastructureError> {
        debug!("Checking if key '{}' exists", key);
        let key = key.to_string();
        self.execute_with_retry("EXISTS", move |mut conn| {
            let key = key.clone();
            Box::pin(async move { conn.exists::<_, bool>(key).await })
        })
        .await
    }

    /// Get time-to-live for a key
    ///
    /// # Returns
    /// * `Ok(None)` - Key doesn't exist or has no expiry
    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, InfrastructureError> {
        debug!("Getting TTL for key '{}'", key);
        let key = key.to_string();
        let ttl_ms = self
            .execute_with_retry("PTTL", move |mut conn| {
                let key = key.clone();
                Box::pin(async move { redis::cmd("PTTL").arg(key).query_async::<_, i64>(&mut conn).await })
            })
            .await?;

        // -1: no expiry, -2: no such key
        Ok(u64::try_from(ttl_ms).ok().map(Duration::from_millis))
    }

    /// Atomically replace `expected` with `new_value`, keeping the TTL
    ///
    /// Runs exactly once: after a lost reply a retry could not tell its own
    /// earlier swap from someone else's, so transport errors are returned
    /// to the caller instead.
    pub async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new_value: &[u8],
    ) -> Result<CasOutcome, InfrastructureError> {
        debug!("Compare-and-swap on key '{}'", key);
        let mut conn = self.connection.clone();
        let mut invocation = self.cas_script.key(key);
        invocation.arg(expected).arg(new_value);

        let outcome = match timeout(
            self.response_timeout,
            invocation.invoke_async::<_, i64>(&mut conn),
        )
        .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!("Compare-and-swap on '{}' failed: {}", key, e);
                return Err(InfrastructureError::Cache(e));
            }
            Err(_) => {
                error!("Compare-and-swap on '{}' timed out", key);
                return Err(InfrastructureError::Timeout {
                    operation: "CAS".to_string(),
                });
            }
        };

        Ok(match outcome {
            1 => CasOutcome::Swapped,
            0 => CasOutcome::Mismatch,
            _ => CasOutcome::Missing,
        })
    }

    /// Add a member to a set and reset the set's TTL, in one transaction
    pub async fn set_add(
        &self,
        key: &str,
        member: &str,
        ttl: Duration,
    ) -> Result<(), InfrastructureError> {
        debug!("Adding member to set '{}'", key);
        let key = key.to_string();
        let member = member.to_string();
        let ttl_ms = ttl_millis(ttl);
        self.execute_with_retry("SADD", move |mut conn| {
            let (key, member) = (key.clone(), member.clone());
            Box::pin(async move {
                redis::pipe()
                    .atomic()
                    .cmd("SADD")
                    .arg(&key)
                    .arg(member)
                    .ignore()
                    .cmd("PEXPIRE")
                    .arg(&key)
                    .arg(ttl_ms)
                    .ignore()
                    .query_async::<_, ()>(&mut conn)
                    .await
            })
        })
        .await
    }

    /// Remove a member from a set
    pub async fn set_remove(&self, key: &str, member: &str) -> Result<bool, InfrastructureError> {
        debug!("Removing member from set '{}'", key);
        let key = key.to_string();
        let member = member.to_string();
        let removed = self
            .execute_with_retry("SREM", move |mut conn| {
                let (key, member) = (key.clone(), member.clone());
                Box::pin(async move { conn.srem::<_, _, u32>(key, member).await })
            })
            .await?;
        Ok(removed > 0)
    }

    /// All members of a set
    pub async fn set_members(&self, key: &str) -> Result<Vec<String>, InfrastructureError> {
        debug!("Reading members of set '{}'", key);
        let key = key.to_string();
        self.execute_with_retry("SMEMBERS", move |mut conn| {
            let key = key.clone();
            Box::pin(async move { conn.smembers::<_, Vec<String>>(key).await })
        })
        .await
    }

    /// Every key starting with `prefix`, via incremental `SCAN`
    pub async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, InfrastructureError> {
        debug!("Scanning keys with prefix '{}'", prefix);
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let pattern = pattern.clone();
            let (next, batch) = self
                .execute_with_retry("SCAN", move |mut conn| {
                    let pattern = pattern.clone();
                    Box::pin(async move {
                        redis::cmd("SCAN")
                            .arg(cursor)
                            .arg("MATCH")
                            .arg(pattern)
                            .arg("COUNT")
                            .arg(SCAN_BATCH)
                            .query_async::<_, (u64, Vec<String>)>(&mut conn)
                            .await
                    })
                })
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    /// Check if the Redis connection is healthy
    ///
    /// Performs a PING command to verify connectivity.
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        debug!("Performing Redis health check");
        let response = self
            .execute_with_retry("PING", |mut conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await?;

        if response == "PONG" {
            debug!("Redis health check passed");
            Ok(true)
        } else {
            warn!("Redis health check returned unexpected response: {}", response);
            Ok(false)
        }
    }

    /// Execute an idempotent Redis operation with retry and deadline
    ///
    /// Each attempt is bounded by the response timeout; transient failures
    /// and timeouts are retried with exponential backoff.
    async fn execute_with_retry<F, T>(
        &self,
        operation: &'static str,
        op: F,
    ) -> Result<T, InfrastructureError>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay_ms;

        loop {
            attempts += 1;
            let conn = self.connection.clone();

            let error = match timeout(self.response_timeout, op(conn)).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if !is_retriable_error(&e) => {
                    error!("Redis {} failed: {}", operation, e);
                    return Err(InfrastructureError::Cache(e));
                }
                Ok(Err(e)) => InfrastructureError::Cache(e),
                Err(_) => InfrastructureError::Timeout {
                    operation: operation.to_string(),
                },
            };

            if attempts >= self.max_retries {
                error!(
                    "Redis {} failed after {} attempts: {}",
                    operation, attempts, error
                );
                return Err(error);
            }

            warn!(
                "Redis {} failed (attempt {}/{}): {}. Retrying in {}ms...",
                operation, attempts, self.max_retries, error, delay
            );
            sleep(Duration::from_millis(delay)).await;
            delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
        }
    }
}

/// Millisecond TTL, never zero: Redis rejects a zero expiry
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Escape `SCAN MATCH` glob metacharacters
pub(crate) fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Check if a Redis error is retriable
///
/// Determines if an error is transient and the operation should be retried.
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    error.is_io_error()
        || error.is_timeout()
        || error.is_connection_dropped()
        || matches!(
            error.kind(),
            redis::ErrorKind::BusyLoadingError | redis::ErrorKind::TryAgain
        )
}

/// Mask sensitive parts of Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(proto_end) = url.find("://") {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
