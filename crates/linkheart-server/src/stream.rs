//! SSE stream for one conversation.
//!
//! GET /matches/:id/events
//!
//! Sends a `connected` event first, then one event per new message
//! (`message`) and read receipt (`read`).  The match already exists when the
//! stream opens, so match-formed events are not forwarded.  A subscriber that
//! falls behind receives a `lagged` event carrying the number of dropped
//! events and should refetch `/messages`.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use linkheart_shared::MatchId;
use linkheart_store::{Delivery, StoreEvent};
use tracing::{debug, warn};

use crate::api::{with_store, AppState};
use crate::error::ServerError;

pub async fn match_events(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    let subscription = with_store(&state, move |store| store.watch_match(match_id)).await?;
    debug!(topic = %match_id.to_topic(), "Conversation stream opened");

    let connected = stream::once(async { Event::default().event("connected").data("ok") });

    // The subscription is owned by the stream; dropping the response cancels it.
    let updates = stream::unfold(subscription, |mut subscription| async move {
        let delivery = subscription.next().await?;
        Some((delivery, subscription))
    })
    .filter_map(|delivery| async move { to_sse_event(delivery) });

    let events = connected.chain(updates).map(Ok::<_, Infallible>);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn to_sse_event(delivery: Delivery) -> Option<Event> {
    let built = match delivery {
        Delivery::Event(StoreEvent::MatchFormed(_)) => return None,
        Delivery::Event(event) => Event::default().event(event.name()).json_data(&event),
        Delivery::Lagged(missed) => Event::default()
            .event("lagged")
            .json_data(serde_json::json!({ "missed": missed })),
    };

    match built {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "Failed to encode stream event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use futures::StreamExt;
    use tower::ServiceExt;

    use crate::api::testing::test_app;

    type Frames = axum::body::BodyDataStream;

    async fn next_frame(body: &mut Frames) -> String {
        let frame = tokio::time::timeout(Duration::from_secs(1), body.next())
            .await
            .expect("frame within a second")
            .expect("stream still open")
            .expect("frame readable");
        String::from_utf8_lossy(&frame).into_owned()
    }

    #[tokio::test]
    async fn stream_pushes_new_messages() {
        let (app, store) = test_app(None);
        let m = store
            .create_match(&"user_1".into(), &"user_2".into())
            .unwrap();

        let response = app
            .oneshot(
                Request::get(format!("/matches/{}/events", m.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/event-stream"));

        let mut body = response.into_body().into_data_stream();
        assert!(next_frame(&mut body).await.contains("event: connected"));

        store
            .append_message(m.id, &"user_1".into(), "hi there", None)
            .unwrap();
        let frame = next_frame(&mut body).await;
        assert!(frame.contains("event: message"));
        assert!(frame.contains("\"text\":\"hi there\""));

        store.mark_read(m.id, &"user_2".into()).unwrap();
        let frame = next_frame(&mut body).await;
        assert!(frame.contains("event: read"));
        assert!(frame.contains("\"count\":1"));
    }

    #[tokio::test]
    async fn stream_for_unknown_match_is_not_found() {
        let (app, _store) = test_app(None);
        let response = app
            .oneshot(
                Request::get(format!("/matches/{}/events", linkheart_shared::MatchId::new()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn lag_becomes_a_lagged_event() {
        assert!(super::to_sse_event(super::Delivery::Lagged(3)).is_some());
    }

    #[test]
    fn match_formed_is_not_forwarded() {
        let store = linkheart_store::Store::in_memory().unwrap();
        let formed = store
            .create_match(&"user_1".into(), &"user_2".into())
            .unwrap();
        let delivery = super::Delivery::Event(super::StoreEvent::MatchFormed(formed));
        assert!(super::to_sse_event(delivery).is_none());
    }
}
