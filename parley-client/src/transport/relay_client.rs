use crate::error::TransportError;
use crate::transport::SignalSink;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parley_core::{
    JoinAccepted, JoinRequest, PeerId, RelayEvent, RoomId, SignalEnvelope, SignalPayload,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

type Reply = oneshot::Sender<Result<Value, TransportError>>;

#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(default)]
    action: Option<String>,
}

/// WebSocket connection to the relay, carrying commands out and relay
/// events in. Commands are answered in order with `ack` or `error` frames.
pub struct RelayClient {
    room_id: RoomId,
    peer_id: PeerId,
    send_tx: mpsc::UnboundedSender<(String, Option<Reply>)>,
}

impl RelayClient {
    /// `base_url` is the relay root, e.g. `ws://127.0.0.1:3000`.
    pub async fn connect(
        base_url: &str,
        room_id: RoomId,
        peer_id: PeerId,
        token: &str,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<RelayEvent>), TransportError> {
        let url = format!(
            "{}/ws/{}/{}?token={}",
            base_url.trim_end_matches('/'),
            room_id,
            peer_id,
            token
        );
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Relay(format!("websocket connect failed: {e}")))?;
        info!(room = %room_id, peer = %peer_id, "Relay connected");

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (send_tx, mut send_rx) = mpsc::unbounded_channel::<(String, Option<Reply>)>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let pending: Arc<Mutex<VecDeque<Option<Reply>>>> = Arc::new(Mutex::new(VecDeque::new()));

        let writer_pending = pending.clone();
        tokio::spawn(async move {
            while let Some((text, reply)) = send_rx.recv().await {
                if let Ok(mut queue) = writer_pending.lock() {
                    queue.push_back(reply);
                }
                if ws_write.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(msg) = ws_read.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Relay websocket error: {}", e);
                        break;
                    }
                };

                let frame: Frame = match serde_json::from_str(text.as_str()) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Unreadable relay frame: {}", e);
                        continue;
                    }
                };

                match frame.event.as_str() {
                    "ack" | "error" => {
                        let reply = pending.lock().ok().and_then(|mut q| q.pop_front());
                        let result = if frame.event == "ack" {
                            Ok(frame.data)
                        } else {
                            Err(rejection(frame.data))
                        };
                        match reply {
                            Some(Some(reply)) => {
                                let _ = reply.send(result);
                            }
                            _ => {
                                if let Err(e) = result {
                                    warn!("Relay rejected signal: {}", e);
                                }
                            }
                        }
                    }
                    _ => {
                        let value = serde_json::json!({ "event": frame.event, "data": frame.data });
                        match serde_json::from_value::<RelayEvent>(value) {
                            Ok(event) => {
                                if events_tx.send(event).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Unknown relay event: {}", e),
                        }
                    }
                }
            }
            debug!("Relay reader finished");
        });

        Ok((
            Arc::new(Self {
                room_id,
                peer_id,
                send_tx,
            }),
            events_rx,
        ))
    }

    fn enqueue(&self, envelope: SignalEnvelope, reply: Option<Reply>) -> Result<(), TransportError> {
        let command = envelope
            .into_command()
            .map_err(|e| TransportError::Relay(e.to_string()))?;
        let text =
            serde_json::to_string(&command).map_err(|e| TransportError::Relay(e.to_string()))?;
        self.send_tx
            .send((text, reply))
            .map_err(|_| TransportError::Relay("relay connection closed".to_owned()))
    }

    pub async fn leave(&self) -> Result<(), TransportError> {
        let envelope = SignalEnvelope::new(
            self.room_id.clone(),
            self.peer_id.clone(),
            SignalPayload::Leave,
        );
        let (tx, rx) = oneshot::channel();
        self.enqueue(envelope, Some(tx))?;
        rx.await
            .map_err(|_| TransportError::Relay("relay connection closed".to_owned()))??;
        Ok(())
    }
}

fn rejection(data: Value) -> TransportError {
    match serde_json::from_value::<ErrorBody>(data) {
        Ok(body) => TransportError::Rejected {
            code: body.error,
            message: body.message,
            action: body.action,
        },
        Err(e) => {
            error!("Malformed relay error frame: {}", e);
            TransportError::Relay(e.to_string())
        }
    }
}

#[async_trait]
impl SignalSink for RelayClient {
    async fn join(
        &self,
        room_id: &RoomId,
        peer_id: &PeerId,
        request: JoinRequest,
    ) -> Result<JoinAccepted, TransportError> {
        let envelope = SignalEnvelope::new(
            room_id.clone(),
            peer_id.clone(),
            SignalPayload::Join(request),
        );
        let (tx, rx) = oneshot::channel();
        self.enqueue(envelope, Some(tx))?;

        let value = rx
            .await
            .map_err(|_| TransportError::Relay("relay connection closed".to_owned()))??;
        serde_json::from_value(value).map_err(|e| TransportError::Relay(e.to_string()))
    }

    async fn signal(&self, envelope: SignalEnvelope) -> Result<(), TransportError> {
        self.enqueue(envelope, None)
    }
}
