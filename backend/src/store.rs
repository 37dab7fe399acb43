//! Read-only client for the tally counters.
//!
//! Counters live in Redis as plain integer strings under `team<ID>` and
//! are incremented by the queue consumer. This process never writes them.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::OnceCell;
use tracing::{error, instrument};

use crate::error::{StartupError, StoreError};
use crate::registry::{Extension, Lifecycle};
use crate::utils::{bounded, connect_redis};

#[rocket::async_trait]
pub trait CounterReader: Send + Sync {
    /// Current value of `key`. A key nobody has incremented yet is
    /// `Ok(None)`, not an error.
    async fn get_key(&self, key: &str) -> Result<Option<i64>, StoreError>;
}

pub struct CounterStore {
    url: String,
    io_timeout: Duration,
    connection: OnceCell<ConnectionManager>,
}

impl CounterStore {
    pub fn new(url: impl Into<String>, io_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            io_timeout,
            connection: OnceCell::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }
}

#[rocket::async_trait]
impl Lifecycle for CounterStore {
    async fn start(&self) -> Result<(), StartupError> {
        self.connection
            .get_or_try_init(|| connect_redis("counter store", &self.url, self.io_timeout))
            .await?;
        Ok(())
    }
}

impl Extension for CounterStore {
    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        Some(self)
    }
}

#[rocket::async_trait]
impl CounterReader for CounterStore {
    #[instrument(skip(self))]
    async fn get_key(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let mut connection = self.connection.get().cloned().ok_or(StoreError::NotConnected)?;

        let read = async {
            let value: Option<i64> = connection.get(key).await?;
            Ok::<_, redis::RedisError>(value)
        };

        match bounded(self.io_timeout, read).await {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => {
                error!("Counter read for {} failed: {}", key, e);
                Err(StoreError::Unavailable(e.to_string()))
            }
            None => Err(StoreError::Timeout(self.io_timeout)),
        }
    }
}
