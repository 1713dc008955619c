use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use parley_core::{PeerId, RoomId};

/// Authorizes a push-channel subscription. Token issuance and real
/// validation belong to the host application.
pub trait CredentialCheck: Send + Sync + 'static {
    fn authorize(&self, room_id: &RoomId, peer_id: &PeerId, token: &str) -> bool;
}

/// Accepts any non-empty bearer token.
pub struct AcceptBearer;

impl CredentialCheck for AcceptBearer {
    fn authorize(&self, _room_id: &RoomId, _peer_id: &PeerId, token: &str) -> bool {
        !token.trim().is_empty()
    }
}

/// `Authorization: Bearer <token>` first, then the `token` query parameter
/// (browsers cannot set headers on EventSource/WebSocket).
pub fn bearer_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
        .or_else(|| query_token.map(str::to_owned))
}
