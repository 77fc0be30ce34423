/// Live tail of the change stream
///
/// ```text
/// XREVRANGE shipments:updates + - COUNT 1            once, on connect
/// XREAD BLOCK {timeout} STREAMS shipments:updates {last_id}
/// ```
///
/// Each [`LiveFeed`] owns its own connection, so a blocking read never
/// delays the writer or another subscriber. The cursor starts at the newest
/// entry present when the feed connects (`0-0` for an empty stream) and
/// only moves forward, including past entries that fail to decode.

use std::collections::HashMap;

use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamRangeReply, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use thiserror::Error;

use crate::events::serialization::{deserialize_change, sender_of, SHIPMENT_STREAM_KEY};
use crate::events::ShipmentChange;
use crate::redis::client::{RedisClient, RedisClientError};

/// Cursor for a stream with no entries yet
const STREAM_START: &str = "0-0";

#[derive(Error, Debug)]
pub enum FeedReaderError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] RedisClientError),

    #[error("Redis command error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Clone)]
pub struct FeedReader {
    client: RedisClient,
    stream_key: String,
    batch_size: usize,
}

impl FeedReader {
    pub fn new(client: RedisClient) -> Self {
        Self::with_stream(client, SHIPMENT_STREAM_KEY)
    }

    pub fn with_stream(client: RedisClient, stream_key: impl Into<String>) -> Self {
        Self {
            client,
            stream_key: stream_key.into(),
            batch_size: 100,
        }
    }

    /// Opens a dedicated connection and positions the cursor after the
    /// newest existing entry
    ///
    /// With `sender` set, entries from other senders are skipped before
    /// their payload is decoded.
    pub async fn connect(&self, sender: Option<i64>) -> Result<LiveFeed, FeedReaderError> {
        let mut conn = self.client.dedicated_connection().await?;

        let newest: StreamRangeReply = conn
            .xrevrange_count(&self.stream_key, "+", "-", 1)
            .await?;
        let last_id = newest
            .ids
            .into_iter()
            .next()
            .map(|entry| entry.id)
            .unwrap_or_else(|| STREAM_START.to_string());

        tracing::debug!(
            stream = %self.stream_key,
            last_id = %last_id,
            "Connected shipment change feed"
        );

        Ok(LiveFeed {
            conn,
            stream_key: self.stream_key.clone(),
            batch_size: self.batch_size,
            sender,
            last_id,
        })
    }
}

/// One subscriber's connection and cursor
pub struct LiveFeed {
    conn: MultiplexedConnection,
    stream_key: String,
    batch_size: usize,
    sender: Option<i64>,
    last_id: String,
}

impl LiveFeed {
    /// Id of the last entry consumed
    pub fn last_id(&self) -> &str {
        &self.last_id
    }

    /// Blocks up to `timeout_ms` for entries after the cursor
    ///
    /// An empty vector means the timeout expired; the cursor stays put.
    pub async fn next_batch(
        &mut self,
        timeout_ms: usize,
    ) -> Result<Vec<ShipmentChange>, FeedReaderError> {
        let opts = StreamReadOptions::default()
            .block(timeout_ms)
            .count(self.batch_size);
        let reply: Option<StreamReadReply> = self
            .conn
            .xread_options(&[&self.stream_key], &[&self.last_id], &opts)
            .await?;

        let entries = reply
            .map(|r| r.keys)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|key| key.ids)
            .map(string_fields);

        let batch = decode_entries(entries, self.sender);
        if let Some(last_id) = batch.last_id {
            self.last_id = last_id;
        }

        Ok(batch.changes)
    }
}

/// Decoded form of one XREAD reply
#[derive(Debug, Default)]
pub(crate) struct FeedBatch {
    /// Id of the last entry seen, decodable or not
    pub last_id: Option<String>,
    pub changes: Vec<ShipmentChange>,
}

fn string_fields(entry: StreamId) -> (String, HashMap<String, String>) {
    let fields = entry
        .map
        .iter()
        .filter_map(|(k, v)| {
            let value = redis::from_redis_value::<String>(v).ok()?;
            Some((k.clone(), value))
        })
        .collect();
    (entry.id, fields)
}

pub(crate) fn decode_entries<I>(entries: I, sender: Option<i64>) -> FeedBatch
where
    I: IntoIterator<Item = (String, HashMap<String, String>)>,
{
    let mut batch = FeedBatch::default();

    for (entry_id, fields) in entries {
        let wanted = sender.map_or(true, |id| sender_of(&fields) == Some(id));
        if wanted {
            match deserialize_change(&fields) {
                Ok(change) => batch.changes.push(change),
                Err(e) => tracing::error!(
                    entry_id = %entry_id,
                    error = %e,
                    "Failed to decode shipment change, skipping"
                ),
            }
        }
        batch.last_id = Some(entry_id);
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::serialization::serialize_change;
    use crate::models::shipment::tests::sample;
    use crate::redis::client::RedisConfig;
    use crate::redis::feed_writer::FeedWriter;

    fn entry(id: &str, shipment_id: i64, sender_id: i64) -> (String, HashMap<String, String>) {
        let mut shipment = sample(shipment_id, "in_transit").without_summaries();
        shipment.sender_id = Some(sender_id);
        let fields = serialize_change(&ShipmentChange::new(shipment)).unwrap();
        (id.to_string(), fields)
    }

    #[test]
    fn test_undecodable_entry_still_advances_cursor() {
        let mut broken = entry("5-0", 2, 1);
        broken.1.insert("payload".to_string(), "{not json".to_string());

        let batch = decode_entries(vec![entry("4-0", 1, 1), broken], None);

        assert_eq!(batch.last_id.as_deref(), Some("5-0"));
        assert_eq!(batch.changes.len(), 1);
        assert_eq!(batch.changes[0].shipment.id, 1);
    }

    #[test]
    fn test_other_senders_are_skipped_before_decoding() {
        // Garbage payload from another sender is never parsed
        let mut theirs = entry("8-0", 2, 99);
        theirs.1.insert("payload".to_string(), "{not json".to_string());

        let batch = decode_entries(vec![entry("7-0", 1, 7), theirs], Some(7));

        assert_eq!(batch.last_id.as_deref(), Some("8-0"));
        assert_eq!(batch.changes.len(), 1);
        assert_eq!(batch.changes[0].shipment.sender_id, Some(7));
    }

    #[test]
    fn test_empty_reply_keeps_cursor() {
        let batch = decode_entries(Vec::new(), None);
        assert!(batch.last_id.is_none());
        assert!(batch.changes.is_empty());
    }

    fn unique_stream() -> String {
        format!(
            "test:shipments:{}",
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        )
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_feed_starts_after_existing_entries() {
        let client = RedisClient::new(RedisConfig::new("redis://localhost:6379"))
            .await
            .unwrap();
        let key = unique_stream();
        let writer = FeedWriter::with_stream(client.clone(), key.clone());

        let old_id = writer
            .publish(&ShipmentChange::new(sample(1, "pending")))
            .await
            .unwrap();

        let mut feed = FeedReader::with_stream(client.clone(), key.clone())
            .connect(None)
            .await
            .unwrap();
        assert_eq!(feed.last_id(), old_id);

        // Nothing new yet: the read times out and the cursor holds
        assert!(feed.next_batch(100).await.unwrap().is_empty());
        assert_eq!(feed.last_id(), old_id);

        let new_id = writer
            .publish(&ShipmentChange::new(sample(2, "in_transit")))
            .await
            .unwrap();

        let changes = feed.next_batch(1000).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].shipment.id, 2);
        assert_eq!(feed.last_id(), new_id);

        let _: () = client.get_connection().del(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_empty_stream_reads_from_start() {
        let client = RedisClient::new(RedisConfig::new("redis://localhost:6379"))
            .await
            .unwrap();
        let key = unique_stream();

        let feed = FeedReader::with_stream(client, key)
            .connect(None)
            .await
            .unwrap();
        assert_eq!(feed.last_id(), STREAM_START);
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_blocking_read_does_not_stall_publish() {
        let client = RedisClient::new(RedisConfig::new("redis://localhost:6379"))
            .await
            .unwrap();
        let key = unique_stream();
        let writer = FeedWriter::with_stream(client.clone(), key.clone());

        let mut feed = FeedReader::with_stream(client.clone(), key.clone())
            .connect(None)
            .await
            .unwrap();
        let read = tokio::spawn(async move { feed.next_batch(3000).await });
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let started = std::time::Instant::now();
        writer
            .publish(&ShipmentChange::new(sample(3, "delivered")))
            .await
            .unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        let changes = read.await.unwrap().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].shipment.id, 3);

        let _: () = client.get_connection().del(&key).await.unwrap();
    }
}
