/// Change notification listener
///
/// A dashboard opens one subscription scoped to every shipment (admin) or
/// to one sender (user). The stream yields a [`ShipmentNotification`] per
/// matching change until the [`Subscription`] is dropped or cancelled.
///
/// If connecting or a read fails the stream ends; it does not reconnect.
///
/// # Example
///
/// ```no_run
/// use futures::StreamExt;
/// use postal_shared::events::{ChangeListener, FeedScope};
/// use postal_shared::redis::{FeedReader, RedisClient, RedisConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RedisClient::new(RedisConfig::new("redis://localhost:6379")).await?;
/// let listener = ChangeListener::new(FeedReader::new(client), FeedScope::Sender(7));
///
/// let (subscription, stream) = listener.subscribe();
/// futures::pin_mut!(stream);
/// if let Some(notification) = stream.next().await {
///     println!("{}", notification.message);
/// }
/// subscription.unsubscribe();
/// # Ok(())
/// # }
/// ```

use futures::stream::{self, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ShipmentChange, ShipmentNotification};
use crate::redis::feed_reader::{FeedReader, FeedReaderError, LiveFeed};

/// Which changes a subscription receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    All,
    Sender(i64),
}

impl FeedScope {
    pub fn matches(&self, change: &ShipmentChange) -> bool {
        match self {
            FeedScope::All => true,
            FeedScope::Sender(id) => change.shipment.sender_id == Some(*id),
        }
    }

    /// Sender to prefilter stream entries on
    pub fn sender(&self) -> Option<i64> {
        match self {
            FeedScope::All => None,
            FeedScope::Sender(id) => Some(*id),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Live shipment updates are not configured")]
    Unavailable,
}

/// Handle that tears a subscription down
///
/// Dropping it has the same effect as calling [`Subscription::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub struct ChangeListener {
    reader: FeedReader,
    scope: FeedScope,
    block_ms: usize,
}

impl ChangeListener {
    pub fn new(reader: FeedReader, scope: FeedScope) -> Self {
        Self {
            reader,
            scope,
            block_ms: 5000,
        }
    }

    /// Builds a listener when the feed is configured
    pub fn open(reader: Option<FeedReader>, scope: FeedScope) -> Result<Self, FeedError> {
        reader
            .map(|reader| Self::new(reader, scope))
            .ok_or(FeedError::Unavailable)
    }

    pub fn scope(&self) -> FeedScope {
        self.scope
    }

    /// Opens the live subscription
    ///
    /// The feed connects on the first poll and delivers changes published
    /// from that point on.
    pub fn subscribe(
        self,
    ) -> (
        Subscription,
        impl Stream<Item = ShipmentNotification> + Send + 'static,
    ) {
        let token = CancellationToken::new();
        let subscription = Subscription {
            token: token.clone(),
        };

        debug!(scope = ?self.scope, "Opening shipment change subscription");

        let batches = stream::unfold(
            (self, None::<LiveFeed>, token),
            |(listener, feed, token)| async move {
                let mut feed = match feed {
                    Some(feed) => feed,
                    None => {
                        let connect = tokio::select! {
                            biased;
                            _ = token.cancelled() => return listener.closed(),
                            connect = listener.reader.connect(listener.scope.sender()) => connect,
                        };
                        match connect {
                            Ok(feed) => feed,
                            Err(e) => return listener.dropped(&e),
                        }
                    }
                };

                loop {
                    let read = tokio::select! {
                        biased;
                        _ = token.cancelled() => return listener.closed(),
                        read = feed.next_batch(listener.block_ms) => read,
                    };

                    let changes = match read {
                        Ok(changes) => changes,
                        Err(e) => return listener.dropped(&e),
                    };

                    let batch: Vec<ShipmentNotification> = changes
                        .into_iter()
                        .filter(|change| listener.scope.matches(change))
                        .map(ShipmentNotification::from)
                        .collect();

                    if !batch.is_empty() {
                        return Some((batch, (listener, Some(feed), token)));
                    }
                }
            },
        );

        (subscription, batches.flat_map(stream::iter))
    }

    fn closed<T>(&self) -> Option<T> {
        debug!(scope = ?self.scope, "Shipment change subscription closed");
        None
    }

    fn dropped<T>(&self, error: &FeedReaderError) -> Option<T> {
        warn!(scope = ?self.scope, error = %error, "Shipment change feed dropped");
        None
    }
}
