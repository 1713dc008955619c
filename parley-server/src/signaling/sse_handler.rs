use crate::error::RelayError;
use crate::signaling::{SessionKey, SignalingService, bearer_token};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use parley_core::{PeerId, RoomId};
use serde::Deserialize;
use std::convert::Infallible;
use tracing::error;

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// `GET /rooms/{room_id}/peers/{peer_id}/events`: the peer's push channel.
pub async fn sse_handler(
    Path((room_id, peer_id)): Path<(String, String)>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    State(service): State<SignalingService>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, RelayError> {
    let key = SessionKey::new(RoomId::from(room_id), PeerId::from(peer_id));
    let token = bearer_token(&headers, query.token.as_deref());
    let subscription = service.subscribe(key, token.as_deref())?;

    let stream = subscription.map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|e| {
            error!("Failed to serialize relay event: {}", e);
            "{}".to_owned()
        });
        Ok(Event::default().event(event.name()).data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
