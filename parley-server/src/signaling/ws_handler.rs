use crate::error::RelayError;
use crate::signaling::{SessionKey, SignalingService, Subscription, TokenQuery, bearer_token};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use parley_core::{PeerId, RoomId, SignalCommand, SignalEnvelope};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// How long the socket stays open for replies after its push stream ended.
const REPLY_WINDOW: Duration = Duration::from_secs(1);

/// `GET /ws/{room_id}/{peer_id}`: push channel and command channel on one
/// socket. Commands get an `ack` or `error` frame back.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((room_id, peer_id)): Path<(String, String)>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
    State(service): State<SignalingService>,
) -> Result<Response, RelayError> {
    let key = SessionKey::new(RoomId::from(room_id), PeerId::from(peer_id));
    let token = bearer_token(&headers, query.token.as_deref());
    let subscription = service.subscribe(key, token.as_deref())?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, subscription, service)))
}

fn frame<T: Serialize>(event: &str, data: &T) -> Option<Message> {
    match serde_json::to_string(&json!({ "event": event, "data": data })) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            error!("Failed to serialize {} frame: {}", event, e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, mut subscription: Subscription, service: SignalingService) {
    let key = subscription.key().clone();
    info!(room = %key.room_id, peer = %key.peer_id, "New WebSocket connection");

    let (mut sender, mut receiver) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Message>();

    let mut send_task = tokio::spawn(async move {
        // A leave, an eviction or an overflow ends the push stream; replies
        // still go out until the socket has been quiet for a moment.
        let mut pushing = true;
        loop {
            let msg = tokio::select! {
                event = subscription.recv(), if pushing => match event {
                    Some(event) => match serde_json::to_string(&event) {
                        Ok(text) => Message::Text(text.into()),
                        Err(e) => {
                            error!("Failed to serialize relay event: {}", e);
                            continue;
                        }
                    },
                    None => {
                        pushing = false;
                        continue;
                    }
                },
                reply = reply_rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
                _ = tokio::time::sleep(REPLY_WINDOW), if !pushing => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };
            if sender.send(msg).await.is_err() {
                break;
            }
        }
        // Dropping the subscription here starts the disconnect grace period.
    });

    let mut recv_task = tokio::spawn({
        let key = key.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                let text = match msg {
                    Message::Text(text) => text,
                    Message::Close(_) => break,
                    _ => continue,
                };

                let result = match serde_json::from_str::<SignalCommand>(&text) {
                    Ok(command) => match SignalEnvelope::try_from(command) {
                        Ok(envelope)
                            if envelope.room_id == key.room_id
                                && envelope.sender == key.peer_id =>
                        {
                            service.handle(envelope).await
                        }
                        Ok(envelope) => Err(RelayError::UnknownPeer(envelope.sender)),
                        Err(e) => Err(e.into()),
                    },
                    Err(e) => Err(RelayError::Wire(e.into())),
                };

                let reply = match result {
                    Ok(reply) => frame("ack", &reply),
                    Err(e) => {
                        warn!(peer = %key.peer_id, "Signal command rejected: {}", e);
                        frame("error", &e.body())
                    }
                };
                if let Some(reply) = reply {
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    info!(room = %key.room_id, peer = %key.peer_id, "WebSocket disconnected");
}
