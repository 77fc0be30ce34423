/// Redis client wrapper
///
/// Wraps a `ConnectionManager`, which reconnects on its own, and adds a
/// PING health check with a timeout.
///
/// The manager multiplexes every caller over one socket, so it must never
/// carry a blocking command. Blocking reads go through
/// [`RedisClient::dedicated_connection`].
///
/// # Example
///
/// ```no_run
/// use postal_shared::redis::client::{RedisClient, RedisConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
/// assert!(client.ping().await?);
/// # Ok(())
/// # }
/// ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::{Client, RedisError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedisClientError {
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    #[error("Redis command error: {0}")]
    CommandError(String),

    #[error("Redis configuration error: {0}")]
    ConfigError(String),

    #[error("Redis health check failed: {0}")]
    HealthCheckFailed(String),
}

impl From<RedisError> for RedisClientError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() {
            RedisClientError::ConnectionError(err.to_string())
        } else {
            RedisClientError::CommandError(err.to_string())
        }
    }
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// redis://[username:password@]host:port[/db]
    pub url: String,

    /// Timeout for the initial connection
    pub connection_timeout_secs: u64,

    /// Timeout for PING
    pub command_timeout_secs: u64,

    /// Approximate number of entries kept in the change stream
    pub stream_max_len: usize,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connection_timeout_secs: 5,
            command_timeout_secs: 10,
            stream_max_len: 10_000,
        }
    }

    /// Loads settings from the environment
    ///
    /// Returns `Ok(None)` when `REDIS_URL` is unset: the change feed is
    /// optional.
    ///
    /// - `REDIS_URL`
    /// - `REDIS_CONNECTION_TIMEOUT_SECS` (default 5)
    /// - `REDIS_COMMAND_TIMEOUT_SECS` (default 10)
    /// - `REDIS_STREAM_MAX_LEN` (default 10000)
    pub fn from_env() -> Result<Option<Self>, RedisClientError> {
        dotenvy::dotenv().ok();

        let url = match env::var("REDIS_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => return Ok(None),
        };

        let mut config = Self::new(url);
        config.connection_timeout_secs = parse_env("REDIS_CONNECTION_TIMEOUT_SECS", 5)?;
        config.command_timeout_secs = parse_env("REDIS_COMMAND_TIMEOUT_SECS", 10)?;
        config.stream_max_len = parse_env("REDIS_STREAM_MAX_LEN", 10_000)?;

        Ok(Some(config))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, RedisClientError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| RedisClientError::ConfigError(format!("{} has an invalid value", name))),
        Err(_) => Ok(default),
    }
}

/// Cloneable Redis handle
#[derive(Clone)]
pub struct RedisClient {
    client: Client,
    manager: ConnectionManager,
    config: Arc<RedisConfig>,
}

impl RedisClient {
    /// Connects to Redis
    ///
    /// # Errors
    ///
    /// Fails if the URL is invalid or the server cannot be reached within
    /// the connection timeout.
    pub async fn new(config: RedisConfig) -> Result<Self, RedisClientError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| RedisClientError::ConfigError(format!("Invalid Redis URL: {}", e)))?;

        let manager = tokio::time::timeout(
            Duration::from_secs(config.connection_timeout_secs),
            ConnectionManager::new(client.clone()),
        )
        .await
        .map_err(|_| RedisClientError::ConnectionError("Connection timed out".to_string()))?
        .map_err(|e| {
            RedisClientError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        tracing::info!(url = %sanitize_url(&config.url), "Redis client connected");

        Ok(Self {
            client,
            manager,
            config: Arc::new(config),
        })
    }

    /// Sends PING; `Ok(true)` on PONG
    pub async fn ping(&self) -> Result<bool, RedisClientError> {
        let mut conn = self.manager.clone();

        let result: Result<String, RedisError> = tokio::time::timeout(
            Duration::from_secs(self.config.command_timeout_secs),
            redis::cmd("PING").query_async(&mut conn),
        )
        .await
        .map_err(|_| RedisClientError::HealthCheckFailed("PING command timed out".to_string()))?;

        match result {
            Ok(pong) if pong == "PONG" => Ok(true),
            Ok(other) => {
                tracing::warn!(response = %other, "Unexpected PING response");
                Ok(false)
            }
            Err(e) => Err(RedisClientError::HealthCheckFailed(e.to_string())),
        }
    }

    pub fn get_connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Opens a new connection that nothing else shares
    ///
    /// For `XREAD BLOCK` and other commands that hold the socket until
    /// they return.
    pub async fn dedicated_connection(&self) -> Result<MultiplexedConnection, RedisClientError> {
        tokio::time::timeout(
            Duration::from_secs(self.config.connection_timeout_secs),
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| RedisClientError::ConnectionError("Connection timed out".to_string()))?
        .map_err(|e| {
            RedisClientError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

/// Replaces credentials in a Redis URL for logging
pub(crate) fn sanitize_url(url: &str) -> String {
    if let (Some(at_pos), Some(scheme_end)) = (url.rfind('@'), url.find("://")) {
        if at_pos > scheme_end {
            return format!("{}***:***@{}", &url[..scheme_end + 3], &url[at_pos + 1..]);
        }
    }
    url.to_string()
}
