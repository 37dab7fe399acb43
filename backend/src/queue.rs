//! Producer side of the vote queue.
//!
//! The broker is a Redis list used as a work queue: each vote is `RPUSH`ed
//! onto `queue_name` and the consumer pops from the other end. A push
//! returns as soon as Redis has accepted the element; consumption is never
//! awaited here.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::OnceCell;
use tracing::{debug, error, instrument};

use crate::error::{PublishError, StartupError};
use crate::registry::{Extension, Lifecycle};
use crate::utils::{bounded, connect_redis};

#[rocket::async_trait]
pub trait VotePublisher: Send + Sync {
    /// Hands one payload to the broker. No retries: a failed publish loses
    /// the vote and is reported to the caller.
    async fn queue_message(&self, payload: &[u8]) -> Result<(), PublishError>;
}

pub struct QueueProducer {
    url: String,
    queue_name: String,
    io_timeout: Duration,
    connection: OnceCell<ConnectionManager>,
}

impl QueueProducer {
    pub fn new(url: impl Into<String>, queue_name: impl Into<String>, io_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            queue_name: queue_name.into(),
            io_timeout,
            connection: OnceCell::new(),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }
}

#[rocket::async_trait]
impl Lifecycle for QueueProducer {
    async fn start(&self) -> Result<(), StartupError> {
        self.connection
            .get_or_try_init(|| connect_redis("queue producer", &self.url, self.io_timeout))
            .await?;
        Ok(())
    }
}

impl Extension for QueueProducer {
    fn lifecycle(&self) -> Option<&dyn Lifecycle> {
        Some(self)
    }
}

#[rocket::async_trait]
impl VotePublisher for QueueProducer {
    #[instrument(skip(self, payload), fields(queue = %self.queue_name, bytes = payload.len()))]
    async fn queue_message(&self, payload: &[u8]) -> Result<(), PublishError> {
        let mut connection = self.connection.get().cloned().ok_or(PublishError::NotConnected)?;

        let push = async {
            let depth: i64 = connection.rpush(&self.queue_name, payload).await?;
            Ok::<_, redis::RedisError>(depth)
        };

        match bounded(self.io_timeout, push).await {
            Some(Ok(depth)) => {
                debug!("Vote queued, queue depth {}", depth);
                Ok(())
            }
            Some(Err(e)) => {
                error!("Broker rejected vote: {}", e);
                Err(PublishError::Rejected(e.to_string()))
            }
            None => {
                error!("Broker did not accept vote within {:?}", self.io_timeout);
                Err(PublishError::Timeout(self.io_timeout))
            }
        }
    }
}
