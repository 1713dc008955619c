use crate::config::ClientConfig;
use crate::control::{ControlEvent, ControlMux, TransferManager};
use crate::error::{CallError, TransferError, TransportError};
use crate::media::MediaTrack;
use crate::negotiation::Negotiator;
use crate::transport::{
    MediaSender, PeerConnectionState, PeerTransport, SignalSink, TransportEvent, TransportFactory,
};
use bytes::Bytes;
use parley_core::utils::CONTROL_CHANNEL_LABEL;
use parley_core::{
    ChatMessage, DeviceState, FileId, IceCandidate, PeerId, RoomId, SessionDescription,
    VbgSettings, WhiteboardMessage,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

mod handle_command_impl;
mod handle_transport_impl;
mod run_impl;

const TRANSPORT_EVENT_BUFFER: usize = 256;
const COMMAND_BUFFER: usize = 64;

pub enum SessionCommand {
    RemoteDescription(SessionDescription),
    RemoteCandidate(IceCandidate),
    Chat(ChatMessage),
    Whiteboard(WhiteboardMessage),
    DeviceState(DeviceState),
    Background(VbgSettings),
    SendFile {
        name: String,
        mime_type: Option<String>,
        data: Bytes,
        reply: oneshot::Sender<Result<FileId, TransferError>>,
    },
    AcceptFile(FileId),
    RejectFile {
        file_id: FileId,
        reason: String,
    },
    CancelFile(FileId),
    RestartIce,
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ConnectionState(PeerConnectionState),
    Control(ControlEvent),
    RemoteTrack(MediaTrack),
    /// The attempt was abandoned; the host should rejoin the room.
    RejoinRequired(String),
    Closed,
}

/// Event of one session, tagged with the remote peer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub remote: PeerId,
    pub event: SessionEvent,
}

/// What a new session starts out with.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub room_id: RoomId,
    pub local: PeerId,
    pub remote: PeerId,
    /// The initiating side creates the control channel; the other side
    /// receives it.
    pub initiator: bool,
    pub audio: MediaTrack,
    pub video: MediaTrack,
    pub device_state: DeviceState,
    pub background: VbgSettings,
}

/// Connection to one remote peer: an actor task owning the negotiation
/// state, the control channel and the file transfers.
pub struct PeerSession {
    room_id: RoomId,
    local: PeerId,
    remote: PeerId,
    config: ClientConfig,
    transport: Arc<dyn PeerTransport>,
    negotiator: Negotiator,
    signal: Arc<dyn SignalSink>,
    mux: ControlMux,
    transfers: TransferManager,
    connection: PeerConnectionState,
    /// Set while a `disconnected` connection gets time to recover.
    reconcile_deadline: Option<Instant>,
    ice_restarts: u32,
    transport_rx: mpsc::Receiver<TransportEvent>,
    command_rx: mpsc::Receiver<SessionCommand>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
}

impl PeerSession {
    /// Creates the peer connection, attaches the local tracks and starts the
    /// session task.
    pub async fn spawn(
        params: SessionParams,
        config: ClientConfig,
        factory: &dyn TransportFactory,
        signal: Arc<dyn SignalSink>,
        updates: mpsc::UnboundedSender<SessionUpdate>,
    ) -> Result<SessionHandle, TransportError> {
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_EVENT_BUFFER);
        let transport = factory.create(&params.remote, transport_tx).await?;

        let audio = transport.attach_track(params.audio).await?;
        let video = transport.attach_track(params.video).await?;
        if params.initiator {
            transport.create_control_channel(CONTROL_CHANNEL_LABEL).await?;
        }

        let mux = ControlMux::with_state(params.device_state, params.background);

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let session = Self {
            negotiator: Negotiator::new(
                params.local.clone(),
                params.remote.clone(),
                transport.clone(),
            ),
            transfers: TransferManager::new(config.transfer.clone()),
            room_id: params.room_id,
            local: params.local,
            remote: params.remote.clone(),
            config,
            transport: transport.clone(),
            signal,
            mux,
            connection: PeerConnectionState::New,
            reconcile_deadline: None,
            ice_restarts: 0,
            transport_rx,
            command_rx,
            updates,
        };

        info!(
            peer = %params.remote,
            initiator = params.initiator,
            polite = session.negotiator.is_polite(),
            "Peer session created"
        );
        let task = tokio::spawn(session.run());

        Ok(SessionHandle {
            remote: params.remote,
            tx: command_tx,
            audio,
            video,
            transport,
            task,
        })
    }

    fn emit(&self, event: SessionEvent) {
        let update = SessionUpdate {
            remote: self.remote.clone(),
            event,
        };
        if self.updates.send(update).is_err() {
            debug!(peer = %self.remote, "No listener for session updates");
        }
    }
}

pub struct SessionHandle {
    remote: PeerId,
    tx: mpsc::Sender<SessionCommand>,
    audio: Arc<dyn MediaSender>,
    video: Arc<dyn MediaSender>,
    transport: Arc<dyn PeerTransport>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn remote(&self) -> &PeerId {
        &self.remote
    }

    pub fn audio_sender(&self) -> Arc<dyn MediaSender> {
        self.audio.clone()
    }

    pub fn video_sender(&self) -> Arc<dyn MediaSender> {
        self.video.clone()
    }

    pub fn transport(&self) -> Arc<dyn PeerTransport> {
        self.transport.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn send(&self, cmd: SessionCommand) -> Result<(), CallError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| CallError::UnknownPeer(self.remote.clone()))
    }

    /// Tears the session down and waits until it is gone.
    pub async fn close(self) {
        // A failed send means the session already stopped on its own.
        if self.tx.send(SessionCommand::Close).await.is_err() {
            debug!(peer = %self.remote, "Session already stopped");
        }
        if let Err(e) = self.task.await {
            warn!(peer = %self.remote, "Session task ended abnormally: {}", e);
        }
    }
}
