use crate::background::{BackgroundPipeline, BackgroundTransform};
use crate::config::ClientConfig;
use crate::control::{TransferEvent, WhiteboardModel};
use crate::error::{CallError, MediaError};
use crate::indicator::aggregate;
use crate::media::{DeviceKind, LocalMedia, MediaDevices, MediaTrack, TrackKind};
use crate::screen_share::{ScreenShareHandle, ShareState};
use crate::session::{PeerSession, SessionCommand, SessionHandle, SessionParams, SessionUpdate};
use crate::transport::{MediaSender, PeerConnectionState, SignalSink, TransportFactory};
use bytes::Bytes;
use parley_core::{
    ChatMessage, ConnectionIndicator, DeviceState, FileId, JoinRequest, LeaveReason, PeerId,
    PeerInfo, RelayEvent, RoomId, VbgSettings, WhiteboardOp,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

mod commands_impl;
mod fanout;
mod relay_events_impl;
mod run_impl;
mod session_updates_impl;

pub use fanout::{FanoutSender, WorstStats};

const COMMAND_BUFFER: usize = 32;

/// What the host application sees of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    Joined {
        existing_peers: Vec<PeerInfo>,
    },
    PeerJoined(PeerInfo),
    PeerLeft {
        peer_id: PeerId,
        reason: LeaveReason,
    },
    /// Worst connection state across all peers changed.
    Indicator(ConnectionIndicator),
    PeerConnection {
        peer_id: PeerId,
        state: PeerConnectionState,
    },
    Chat {
        from: PeerId,
        message: ChatMessage,
    },
    RemoteDeviceState {
        peer_id: PeerId,
        state: DeviceState,
    },
    /// Track to render for a peer's video, with their background effect applied.
    RemoteVideo {
        peer_id: PeerId,
        track: MediaTrack,
    },
    RemoteAudio {
        peer_id: PeerId,
        track: MediaTrack,
    },
    Whiteboard(WhiteboardOp),
    /// The board was replaced by a snapshot from a peer.
    WhiteboardReset(Vec<WhiteboardOp>),
    Transfer {
        peer_id: PeerId,
        event: TransferEvent,
    },
    /// A newer session of the same user took over; this call is over.
    LoggedInElsewhere {
        replaced_by: PeerId,
    },
    /// The connection to `peer_id` was abandoned; rejoin to recover.
    RejoinRequired {
        peer_id: PeerId,
        reason: String,
    },
    RelayDisconnected,
    Left,
}

pub(crate) enum CallCommand {
    SetDevice {
        kind: DeviceKind,
        enabled: bool,
        reply: oneshot::Sender<Result<(), CallError>>,
    },
    SetBackground {
        settings: VbgSettings,
        reply: oneshot::Sender<Result<(), CallError>>,
    },
    Chat {
        text: String,
        reply: oneshot::Sender<Result<ChatMessage, CallError>>,
    },
    Draw(WhiteboardOp),
    SendFile {
        to: PeerId,
        name: String,
        mime_type: Option<String>,
        data: Bytes,
        reply: oneshot::Sender<Result<FileId, CallError>>,
    },
    ForPeer {
        peer_id: PeerId,
        cmd: SessionCommand,
    },
    StartScreenShare {
        screen: MediaTrack,
        ended: oneshot::Receiver<()>,
        reply: oneshot::Sender<Result<watch::Receiver<ShareState>, CallError>>,
    },
    StopScreenShare {
        reply: oneshot::Sender<()>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
}

/// Capabilities a call runs on.
#[derive(Clone)]
pub struct CallDeps {
    pub factory: Arc<dyn TransportFactory>,
    pub signal: Arc<dyn SignalSink>,
    pub devices: Arc<dyn MediaDevices>,
    pub transform: Arc<dyn BackgroundTransform>,
}

#[derive(Debug, Clone)]
pub struct CallParams {
    pub room_id: RoomId,
    pub local: PeerId,
    pub join: JoinRequest,
}

/// Orchestrates one peer's participation in a room: relay events in, one
/// [`PeerSession`] per remote peer, local media fanned out to all of them.
pub struct CallEngine {
    config: ClientConfig,
    room_id: RoomId,
    local: PeerId,
    display_name: String,
    deps: CallDeps,
    media: LocalMedia,
    camera_pipeline: BackgroundPipeline,
    video_placeholder: MediaTrack,
    audio_placeholder: MediaTrack,
    /// What the camera slot currently sends; screen sharing reverts to it.
    camera_tx: watch::Sender<Option<MediaTrack>>,
    video: Arc<FanoutSender>,
    audio: Arc<FanoutSender>,
    stats: Arc<WorstStats>,
    screen_share: Option<ScreenShareHandle>,
    sessions: HashMap<PeerId, SessionHandle>,
    remote_pipelines: HashMap<PeerId, BackgroundPipeline>,
    remote_backgrounds: HashMap<PeerId, VbgSettings>,
    indicators: HashMap<PeerId, ConnectionIndicator>,
    indicator: ConnectionIndicator,
    whiteboard: WhiteboardModel,
    relay_rx: mpsc::UnboundedReceiver<RelayEvent>,
    relay_open: bool,
    command_rx: mpsc::Receiver<CallCommand>,
    session_tx: mpsc::UnboundedSender<SessionUpdate>,
    session_rx: mpsc::UnboundedReceiver<SessionUpdate>,
    events: mpsc::UnboundedSender<CallEvent>,
}

impl CallEngine {
    /// Acquires local media, joins the room and connects to everyone already
    /// in it. Denied devices do not fail the join.
    pub async fn join(
        config: ClientConfig,
        params: CallParams,
        deps: CallDeps,
        relay_rx: mpsc::UnboundedReceiver<RelayEvent>,
    ) -> Result<(CallHandle, mpsc::UnboundedReceiver<CallEvent>), CallError> {
        config.transfer.validate()?;
        let media = LocalMedia::acquire(deps.devices.clone()).await;
        let camera_pipeline = BackgroundPipeline::new(
            deps.transform.clone(),
            media.track(DeviceKind::Camera).clone(),
        );

        let accepted = deps
            .signal
            .join(&params.room_id, &params.local, params.join.clone())
            .await?;
        info!(
            room = %params.room_id,
            peer = %params.local,
            existing = accepted.existing_peers.len(),
            "Joined room"
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (session_tx, session_rx) = mpsc::unbounded_channel();

        let mut engine = Self {
            display_name: params.join.display_name.clone(),
            room_id: params.room_id,
            local: params.local.clone(),
            video_placeholder: MediaTrack::placeholder(TrackKind::Video),
            audio_placeholder: MediaTrack::placeholder(TrackKind::Audio),
            camera_tx: watch::channel(None).0,
            video: Arc::new(FanoutSender::default()),
            audio: Arc::new(FanoutSender::default()),
            stats: Arc::new(WorstStats::default()),
            screen_share: None,
            sessions: HashMap::new(),
            remote_pipelines: HashMap::new(),
            remote_backgrounds: HashMap::new(),
            indicators: HashMap::new(),
            indicator: ConnectionIndicator::Healthy,
            whiteboard: WhiteboardModel::new(),
            relay_rx,
            relay_open: true,
            command_rx,
            session_tx,
            session_rx,
            events: events_tx,
            config,
            deps,
            media,
            camera_pipeline,
        };
        engine.refresh_camera().await;
        engine.refresh_microphone().await;

        engine.emit(CallEvent::Joined {
            existing_peers: accepted.existing_peers.clone(),
        });
        for peer in accepted.existing_peers {
            engine.open_session(peer.peer_id, true).await;
        }

        let task = tokio::spawn(engine.run());
        Ok((
            CallHandle {
                local: params.local,
                tx: command_tx,
                task,
            },
            events_rx,
        ))
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.events.send(event);
    }

    fn is_sharing(&self) -> bool {
        self.screen_share.as_ref().is_some_and(|s| !s.is_finished())
    }

    fn device_state(&self) -> DeviceState {
        self.media
            .device_state(self.camera_pipeline.settings().mode.is_active())
    }

    fn camera_output(&self) -> MediaTrack {
        if self.media.is_enabled(DeviceKind::Camera) {
            self.camera_pipeline.output().clone()
        } else {
            self.video_placeholder.clone()
        }
    }

    /// Puts the current camera output on every video sender, unless a
    /// screen is being shared.
    async fn refresh_camera(&mut self) {
        let output = self.camera_output();
        self.camera_tx.send_replace(Some(output.clone()));
        if self.is_sharing() {
            return;
        }
        if let Err(e) = self.video.replace_track(Some(output)).await {
            warn!("Replacing camera track failed: {}", e);
        }
    }

    async fn refresh_microphone(&mut self) {
        let track = if self.media.is_enabled(DeviceKind::Microphone) {
            self.media.track(DeviceKind::Microphone).clone()
        } else {
            self.audio_placeholder.clone()
        };
        if let Err(e) = self.audio.replace_track(Some(track)).await {
            warn!("Replacing microphone track failed: {}", e);
        }
    }

    async fn open_session(&mut self, remote: PeerId, initiator: bool) {
        if remote == self.local || self.sessions.contains_key(&remote) {
            return;
        }

        let params = SessionParams {
            room_id: self.room_id.clone(),
            local: self.local.clone(),
            remote: remote.clone(),
            initiator,
            audio: self
                .audio
                .current()
                .await
                .unwrap_or_else(|| self.audio_placeholder.clone()),
            video: self
                .video
                .current()
                .await
                .unwrap_or_else(|| self.video_placeholder.clone()),
            device_state: self.device_state(),
            background: self.camera_pipeline.settings().clone(),
        };

        let spawned = PeerSession::spawn(
            params,
            self.config.clone(),
            self.deps.factory.as_ref(),
            self.deps.signal.clone(),
            self.session_tx.clone(),
        )
        .await;

        match spawned {
            Ok(handle) => {
                self.video.add(remote.clone(), handle.video_sender()).await;
                self.audio.add(remote.clone(), handle.audio_sender()).await;
                self.stats.add(remote.clone(), handle.transport());
                self.sessions.insert(remote.clone(), handle);
                self.set_indicator(&remote, Some(ConnectionIndicator::Degraded));
            }
            Err(e) => {
                warn!(peer = %remote, "Could not open peer session: {}", e);
                self.emit(CallEvent::RejoinRequired {
                    peer_id: remote,
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn close_session(&mut self, remote: &PeerId) {
        self.video.remove(remote);
        self.audio.remove(remote);
        self.stats.remove(remote);
        self.remote_backgrounds.remove(remote);
        if let Some(mut pipeline) = self.remote_pipelines.remove(remote) {
            pipeline.release().await;
        }
        self.set_indicator(remote, None);

        if let Some(handle) = self.sessions.remove(remote) {
            handle.close().await;
        }
    }

    async fn close_all_sessions(&mut self) {
        let remotes: Vec<PeerId> = self.sessions.keys().cloned().collect();
        for remote in remotes {
            self.close_session(&remote).await;
        }
    }

    async fn broadcast(&self, cmd: impl Fn() -> SessionCommand) {
        for (remote, session) in &self.sessions {
            if let Err(e) = session.send(cmd()).await {
                warn!(peer = %remote, "Session unavailable: {}", e);
            }
        }
    }

    fn set_indicator(&mut self, remote: &PeerId, indicator: Option<ConnectionIndicator>) {
        match indicator {
            Some(indicator) => {
                self.indicators.insert(remote.clone(), indicator);
            }
            None => {
                self.indicators.remove(remote);
            }
        }

        let worst = aggregate(self.indicators.values().copied());
        if worst != self.indicator {
            self.indicator = worst;
            self.emit(CallEvent::Indicator(worst));
        }
    }

    async fn apply_camera_background(&mut self, settings: VbgSettings) -> Result<(), MediaError> {
        if self.camera_pipeline.apply(settings).await?.is_some() {
            self.refresh_camera().await;
        }
        Ok(())
    }
}

/// Host-side handle of a running call.
pub struct CallHandle {
    local: PeerId,
    tx: mpsc::Sender<CallCommand>,
    task: JoinHandle<()>,
}

impl CallHandle {
    pub fn local(&self) -> &PeerId {
        &self.local
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> CallCommand,
    ) -> Result<T, CallError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| CallError::Stopped)?;
        rx.await.map_err(|_| CallError::Stopped)
    }

    /// Turns a device on or off. Turning on a device that was denied asks
    /// for permission again.
    pub async fn set_device_enabled(&self, kind: DeviceKind, enabled: bool) -> Result<(), CallError> {
        self.request(|reply| CallCommand::SetDevice {
            kind,
            enabled,
            reply,
        })
        .await?
    }

    pub async fn set_background(&self, settings: VbgSettings) -> Result<(), CallError> {
        self.request(|reply| CallCommand::SetBackground { settings, reply })
            .await?
    }

    pub async fn send_chat(&self, text: impl Into<String>) -> Result<ChatMessage, CallError> {
        let text = text.into();
        self.request(|reply| CallCommand::Chat { text, reply }).await?
    }

    pub async fn draw(&self, op: WhiteboardOp) -> Result<(), CallError> {
        self.tx
            .send(CallCommand::Draw(op))
            .await
            .map_err(|_| CallError::Stopped)
    }

    pub async fn send_file(
        &self,
        to: PeerId,
        name: impl Into<String>,
        mime_type: Option<String>,
        data: Bytes,
    ) -> Result<FileId, CallError> {
        let name = name.into();
        self.request(|reply| CallCommand::SendFile {
            to,
            name,
            mime_type,
            data,
            reply,
        })
        .await?
    }

    async fn for_peer(&self, peer_id: PeerId, cmd: SessionCommand) -> Result<(), CallError> {
        self.tx
            .send(CallCommand::ForPeer { peer_id, cmd })
            .await
            .map_err(|_| CallError::Stopped)
    }

    pub async fn accept_file(&self, from: PeerId, file_id: FileId) -> Result<(), CallError> {
        self.for_peer(from, SessionCommand::AcceptFile(file_id)).await
    }

    pub async fn reject_file(
        &self,
        from: PeerId,
        file_id: FileId,
        reason: impl Into<String>,
    ) -> Result<(), CallError> {
        let reason = reason.into();
        self.for_peer(from, SessionCommand::RejectFile { file_id, reason })
            .await
    }

    pub async fn cancel_file(&self, peer_id: PeerId, file_id: FileId) -> Result<(), CallError> {
        self.for_peer(peer_id, SessionCommand::CancelFile(file_id))
            .await
    }

    /// Manual ICE restart towards one peer.
    pub async fn restart_ice(&self, peer_id: PeerId) -> Result<(), CallError> {
        self.for_peer(peer_id, SessionCommand::RestartIce).await
    }

    /// Shares `screen` with everyone. `ended` fires when the capture stops
    /// on its own; the camera is then put back automatically.
    pub async fn start_screen_share(
        &self,
        screen: MediaTrack,
        ended: oneshot::Receiver<()>,
    ) -> Result<watch::Receiver<ShareState>, CallError> {
        self.request(|reply| CallCommand::StartScreenShare {
            screen,
            ended,
            reply,
        })
        .await?
    }

    pub async fn stop_screen_share(&self) -> Result<(), CallError> {
        self.request(|reply| CallCommand::StopScreenShare { reply })
            .await
    }

    /// Leaves the room and tears down every peer connection.
    pub async fn leave(self) -> Result<(), CallError> {
        let result = self.request(|reply| CallCommand::Leave { reply }).await;
        let _ = self.task.await;
        result
    }
}
