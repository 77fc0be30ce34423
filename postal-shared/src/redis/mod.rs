/// Redis plumbing for the shipment change feed
///
/// - `client`: connection management and health checks
/// - `feed_writer`: XADD of shipment changes
/// - `feed_reader`: per-subscriber XREAD BLOCK tail of shipment changes

pub mod client;
pub mod feed_reader;
pub mod feed_writer;

pub use client::{RedisClient, RedisClientError, RedisConfig};
pub use feed_reader::{FeedReader, FeedReaderError, LiveFeed};
pub use feed_writer::{FeedWriter, FeedWriterError};
