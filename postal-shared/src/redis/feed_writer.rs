/// Publishes shipment changes to the change stream
///
/// One XADD per change, with approximate MAXLEN trimming so the stream
/// stays bounded. Failures are returned to the caller; there is no retry.

use redis::streams::StreamMaxlen;
use redis::AsyncCommands;
use thiserror::Error;

use crate::events::serialization::{serialize_change, SerializationError, SHIPMENT_STREAM_KEY};
use crate::events::ShipmentChange;
use crate::redis::client::RedisClient;

#[derive(Error, Debug)]
pub enum FeedWriterError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Redis command error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Clone)]
pub struct FeedWriter {
    client: RedisClient,
    stream_key: String,
}

impl FeedWriter {
    pub fn new(client: RedisClient) -> Self {
        Self::with_stream(client, SHIPMENT_STREAM_KEY)
    }

    /// Writer bound to a custom stream key (tests use a unique key)
    pub fn with_stream(client: RedisClient, stream_key: impl Into<String>) -> Self {
        Self {
            client,
            stream_key: stream_key.into(),
        }
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    /// Appends the change and returns its stream entry id
    pub async fn publish(&self, change: &ShipmentChange) -> Result<String, FeedWriterError> {
        let fields = serialize_change(change)?;
        let items: Vec<(String, String)> = fields.into_iter().collect();

        let mut conn = self.client.get_connection();
        let max_len = StreamMaxlen::Approx(self.client.config().stream_max_len);
        let entry_id: String = conn
            .xadd_maxlen(&self.stream_key, max_len, "*", &items)
            .await?;

        tracing::debug!(
            shipment_id = change.shipment.id,
            status = %change.shipment.status,
            entry_id = %entry_id,
            "Published shipment change"
        );

        Ok(entry_id)
    }
}
