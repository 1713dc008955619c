use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_core::{PeerId, RoomId, SignalAction, WireError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("room {0} does not exist")]
    UnknownRoom(RoomId),

    #[error("peer {0} is not a member of the room")]
    UnknownPeer(PeerId),

    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("peer {0} has no open subscription")]
    NotSubscribed(PeerId),

    #[error("action {0:?} is not relayed to other peers")]
    NotRelayable(SignalAction),

    #[error("missing or rejected access token")]
    Unauthorized,

    /// The room actor retired while the command was queued.
    #[error("room {0} is shutting down")]
    RoomClosed(RoomId),
}

#[derive(Debug, Serialize)]
pub(crate) struct RelayErrorBody {
    pub error: &'static str,
    pub message: String,
    /// What the client should do next.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
}

impl RelayError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Wire(WireError::MalformedDescription(_)) => "malformed_description",
            Self::Wire(_) => "malformed_envelope",
            Self::UnknownRoom(_) => "unknown_room",
            Self::UnknownPeer(_) => "unknown_peer",
            Self::RoomFull(_) => "room_full",
            Self::NotSubscribed(_) => "not_subscribed",
            Self::NotRelayable(_) => "not_relayable",
            Self::Unauthorized => "unauthorized",
            Self::RoomClosed(_) => "room_closed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Wire(WireError::MalformedDescription(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Wire(_) | Self::NotRelayable(_) => StatusCode::BAD_REQUEST,
            Self::UnknownRoom(_) | Self::UnknownPeer(_) => StatusCode::NOT_FOUND,
            Self::RoomFull(_) | Self::NotSubscribed(_) => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RoomClosed(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn next_action(&self) -> Option<&'static str> {
        match self {
            Self::Wire(WireError::MalformedDescription(_))
            | Self::UnknownRoom(_)
            | Self::UnknownPeer(_)
            | Self::RoomClosed(_) => Some("rejoin"),
            Self::NotSubscribed(_) => Some("subscribe"),
            _ => None,
        }
    }

    pub(crate) fn body(&self) -> RelayErrorBody {
        RelayErrorBody {
            error: self.code(),
            message: self.to_string(),
            action: self.next_action(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
