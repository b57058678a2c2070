//! Redis-backed regional store.

use async_trait::async_trait;
use edge_core::Region;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::OnceCell;

use crate::error::StoreError;
use crate::record::CounterRecord;
use crate::regional::RegionalStore;

/// Counter store on a per-region Redis endpoint.
///
/// Keys are prefixed with the counter table (`"{table}:{key}"`); increments
/// use `INCR`, which is atomic on the server. The connection is opened on
/// first use, so an endpoint that is down at startup shows up as an
/// unavailable region rather than a startup failure.
pub struct RedisStore {
    region: Region,
    client: Client,
    connection: OnceCell<ConnectionManager>,
    prefix: String,
}

impl RedisStore {
    /// Create a store for the Redis endpoint at `url`. Only the URL is
    /// validated here.
    pub fn new(url: &str, table: &str, region: Region) -> Result<Self, StoreError> {
        let client =
            Client::open(url).map_err(|e| StoreError::unavailable(region, e.to_string()))?;

        Ok(Self {
            region,
            client,
            connection: OnceCell::new(),
            prefix: format!("{}:", table),
        })
    }

    /// Apply the prefix to a key.
    #[inline]
    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn backend_error(&self, err: redis::RedisError) -> StoreError {
        StoreError::unavailable(self.region, err.to_string())
    }

    /// Shared connection, established on the first call that succeeds.
    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let connection = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| self.backend_error(e))?;
                tracing::info!(region = %self.region, prefix = %self.prefix, "Connected regional Redis store");
                Ok::<_, StoreError>(connection)
            })
            .await?;
        Ok(connection.clone())
    }
}

#[async_trait]
impl RegionalStore for RedisStore {
    fn region(&self) -> Region {
        self.region
    }

    async fn increment(&self, key: &str) -> Result<CounterRecord, StoreError> {
        let mut conn = self.connection().await?;
        let value: u64 = conn
            .incr(self.prefixed_key(key), 1u64)
            .await
            .map_err(|e| self.backend_error(e))?;

        Ok(CounterRecord::new(key, value, self.region))
    }

    async fn read(&self, key: &str) -> Result<CounterRecord, StoreError> {
        let mut conn = self.connection().await?;
        let value: Option<u64> = conn
            .get(self.prefixed_key(key))
            .await
            .map_err(|e| self.backend_error(e))?;

        Ok(CounterRecord::new(key, value.unwrap_or(0), self.region))
    }
}
