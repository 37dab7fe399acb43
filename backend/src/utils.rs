use std::future::Future;
use std::time::Duration;

use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::Client;
use tokio::time::timeout;
use tracing::{error, info};

use crate::error::StartupError;

/// Opens a managed Redis connection and checks it answers PING. Every step
/// is bounded by `io_timeout`.
pub async fn connect_redis(
    extension: &'static str,
    url: &str,
    io_timeout: Duration,
) -> Result<ConnectionManager, StartupError> {
    let client = Client::open(url).map_err(|e| StartupError::InvalidUrl {
        extension,
        reason: e.to_string(),
    })?;

    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Some(io_timeout));

    let connect = async {
        let mut connection = client.get_connection_manager_with_config(config).await?;
        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        Ok::<_, redis::RedisError>(connection)
    };

    match timeout(io_timeout, connect).await {
        Ok(Ok(connection)) => {
            info!("{} connected", extension);
            Ok(connection)
        }
        Ok(Err(e)) => {
            error!("{} failed to connect: {}", extension, e);
            Err(StartupError::Connect { extension, reason: e.to_string() })
        }
        Err(_) => {
            error!("{} did not connect within {:?}", extension, io_timeout);
            Err(StartupError::Timeout { extension, timeout: io_timeout })
        }
    }
}

/// `None` when the future did not finish within `limit`.
pub async fn bounded<F: Future>(limit: Duration, fut: F) -> Option<F::Output> {
    timeout(limit, fut).await.ok()
}
