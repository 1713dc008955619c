use crate::error::WireError;
use crate::model::peer::{PeerId, Role, RoomId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// Session description as exchanged between peers. The relay forwards the
/// body untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }

    /// Structural check: expected type and an SDP version line first.
    pub fn validate(&self, expected: SdpType) -> Result<(), WireError> {
        if self.kind != expected {
            return Err(WireError::MalformedDescription(format!(
                "expected {:?}, got {:?}",
                expected, self.kind
            )));
        }
        if !self.sdp.trim_start().starts_with("v=") {
            return Err(WireError::MalformedDescription(
                "body does not start with a version line".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}

/// Display metadata carried by `join`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Join,
    Offer,
    Answer,
    Ice,
    Leave,
}

/// Raw command as posted by clients: `{action, roomId, peerId, data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalCommand {
    pub action: SignalAction,
    pub room_id: String,
    pub peer_id: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalPayload {
    Join(JoinRequest),
    Offer(SessionDescription),
    Answer(SessionDescription),
    Ice(IceCandidate),
    Leave,
}

impl SignalPayload {
    pub fn action(&self) -> SignalAction {
        match self {
            Self::Join(_) => SignalAction::Join,
            Self::Offer(_) => SignalAction::Offer,
            Self::Answer(_) => SignalAction::Answer,
            Self::Ice(_) => SignalAction::Ice,
            Self::Leave => SignalAction::Leave,
        }
    }
}

/// Validated signaling envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEnvelope {
    pub room_id: RoomId,
    pub sender: PeerId,
    /// Unicast target for rooms with more than two members.
    pub target: Option<PeerId>,
    pub payload: SignalPayload,
}

impl SignalEnvelope {
    pub fn new(room_id: RoomId, sender: PeerId, payload: SignalPayload) -> Self {
        Self {
            room_id,
            sender,
            target: None,
            payload,
        }
    }

    pub fn to(mut self, target: PeerId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn into_command(self) -> Result<SignalCommand, WireError> {
        let action = self.payload.action();
        let data = match self.payload {
            SignalPayload::Join(join) => serde_json::to_value(join)?,
            SignalPayload::Offer(desc) | SignalPayload::Answer(desc) => {
                serde_json::to_value(desc)?
            }
            SignalPayload::Ice(candidate) => serde_json::to_value(candidate)?,
            SignalPayload::Leave => serde_json::Value::Null,
        };
        Ok(SignalCommand {
            action,
            room_id: self.room_id.0,
            peer_id: self.sender.0,
            data,
            target: self.target.map(|t| t.0),
        })
    }
}

impl TryFrom<SignalCommand> for SignalEnvelope {
    type Error = WireError;

    fn try_from(cmd: SignalCommand) -> Result<Self, Self::Error> {
        if cmd.room_id.trim().is_empty() {
            return Err(WireError::Missing("roomId"));
        }
        if cmd.peer_id.trim().is_empty() {
            return Err(WireError::Missing("peerId"));
        }

        let payload = match cmd.action {
            SignalAction::Join => {
                let join = if cmd.data.is_null() {
                    JoinRequest::default()
                } else {
                    serde_json::from_value::<JoinRequest>(cmd.data)?
                };
                SignalPayload::Join(join)
            }
            SignalAction::Offer => {
                let desc: SessionDescription = serde_json::from_value(cmd.data)?;
                desc.validate(SdpType::Offer)?;
                SignalPayload::Offer(desc)
            }
            SignalAction::Answer => {
                let desc: SessionDescription = serde_json::from_value(cmd.data)?;
                desc.validate(SdpType::Answer)?;
                SignalPayload::Answer(desc)
            }
            SignalAction::Ice => SignalPayload::Ice(serde_json::from_value(cmd.data)?),
            SignalAction::Leave => SignalPayload::Leave,
        };

        Ok(Self {
            room_id: RoomId(cmd.room_id),
            sender: PeerId(cmd.peer_id),
            target: cmd.target.filter(|t| !t.is_empty()).map(PeerId),
            payload,
        })
    }
}
