/// Live shipment updates over Server-Sent Events
///
/// ```text
/// GET /v1/user/feed    changes to the caller's own shipments
/// GET /v1/admin/feed   every change
/// ```
///
/// Each change arrives as a `shipment_update` event:
///
/// ```text
/// event: shipment_update
/// data: {"message":"Shipment #42 status updated to in_transit","shipment":{...}}
/// ```
///
/// The pushed shipment is the plain row, without sender or method names.
/// Answers 503 when Redis is not configured.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::{future::ready, Stream, StreamExt};
use postal_shared::{
    auth::Identity,
    events::{ChangeListener, FeedScope},
};
use std::convert::Infallible;
use std::time::Duration;
use tracing::{info, warn};

pub const EVENT_NAME: &str = "shipment_update";

const KEEP_ALIVE: Duration = Duration::from_secs(25);

type FeedResponse = Sse<std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

pub async fn user_feed(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<FeedResponse, ApiError> {
    open_feed(&state, FeedScope::Sender(identity.user_id()))
}

pub async fn admin_feed(State(state): State<AppState>) -> Result<FeedResponse, ApiError> {
    open_feed(&state, FeedScope::All)
}

fn open_feed(state: &AppState, scope: FeedScope) -> Result<FeedResponse, ApiError> {
    let listener = ChangeListener::open(state.feed.clone(), scope)?;
    info!(scope = ?scope, "Client subscribed to shipment updates");

    Ok(Sse::new(notification_events(listener)).keep_alive(KeepAlive::new().interval(KEEP_ALIVE)))
}

fn notification_events(
    listener: ChangeListener,
) -> std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>> {
    let (subscription, notifications) = listener.subscribe();

    // The subscription lives as long as the response body.
    let events = notifications.filter_map(move |notification| {
        let _subscription = &subscription;
        ready(
            match Event::default().event(EVENT_NAME).json_data(&notification) {
                Ok(event) => Some(Ok(event)),
                Err(e) => {
                    warn!(shipment_id = notification.shipment.id, error = %e, "Failed to encode shipment update");
                    None
                }
            },
        )
    });

    Box::pin(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use postal_shared::db::pool::{create_lazy_pool, DatabaseConfig};

    #[tokio::test]
    async fn test_feed_without_redis_is_unavailable() {
        let config = test_config();
        let pool = create_lazy_pool(&DatabaseConfig::new(config.database.url.clone(), 2)).unwrap();
        let state = AppState::new(pool, config);

        let response = match admin_feed(State(state)).await {
            Ok(_) => panic!("feed should be unavailable without Redis"),
            Err(e) => e.into_response(),
        };
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
