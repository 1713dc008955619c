use crate::error::RelayError;
use crate::signaling::{CommandReply, SignalingService};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use parley_core::{SignalCommand, SignalEnvelope, WireError};
use tracing::{debug, warn};

/// `POST /signal`: `{action, roomId, peerId, data, target?}`.
pub async fn command_handler(
    State(service): State<SignalingService>,
    body: Result<Json<SignalCommand>, JsonRejection>,
) -> Result<Json<CommandReply>, RelayError> {
    let Json(command) = body.map_err(|rejection| {
        warn!("Rejected signal command: {}", rejection.body_text());
        RelayError::Wire(WireError::invalid("body", rejection.body_text()))
    })?;

    debug!(action = ?command.action, room = %command.room_id, peer = %command.peer_id, "Signal command");
    let envelope = SignalEnvelope::try_from(command)?;
    let reply = service.handle(envelope).await?;
    Ok(Json(reply))
}
