use crate::call::{CallCommand, CallEngine, CallEvent};
use crate::error::{CallError, MediaError};
use crate::media::{DeviceKind, MediaTrack};
use crate::screen_share::{ScreenShareController, ShareState};
use crate::session::SessionCommand;
use parley_core::{ChatMessage, VbgSettings, WhiteboardMessage, WhiteboardOp};
use std::ops::ControlFlow;
use tokio::sync::{oneshot, watch};
use tracing::{info, warn};

impl CallEngine {
    pub(super) async fn on_command(&mut self, cmd: CallCommand) -> ControlFlow<()> {
        match cmd {
            CallCommand::SetDevice {
                kind,
                enabled,
                reply,
            } => {
                let result = self.set_device(kind, enabled).await;
                let _ = reply.send(result);
            }
            CallCommand::SetBackground { settings, reply } => {
                let result = self.set_background(settings).await;
                let _ = reply.send(result);
            }
            CallCommand::Chat { text, reply } => {
                let message = ChatMessage::new(text, self.display_name.clone());
                let outgoing = message.clone();
                self.broadcast(|| SessionCommand::Chat(outgoing.clone()))
                    .await;
                let _ = reply.send(Ok(message));
            }
            CallCommand::Draw(op) => self.draw(op).await,
            CallCommand::SendFile {
                to,
                name,
                mime_type,
                data,
                reply,
            } => {
                let Some(session) = self.sessions.get(&to) else {
                    let _ = reply.send(Err(CallError::UnknownPeer(to)));
                    return ControlFlow::Continue(());
                };
                let (file_reply, file_rx) = oneshot::channel();
                let cmd = SessionCommand::SendFile {
                    name,
                    mime_type,
                    data,
                    reply: file_reply,
                };
                if let Err(e) = session.send(cmd).await {
                    let _ = reply.send(Err(e));
                    return ControlFlow::Continue(());
                }
                // The offer is answered without holding up the engine.
                tokio::spawn(async move {
                    let result = match file_rx.await {
                        Ok(result) => result.map_err(CallError::from),
                        Err(_) => Err(CallError::UnknownPeer(to)),
                    };
                    let _ = reply.send(result);
                });
            }
            CallCommand::ForPeer { peer_id, cmd } => match self.sessions.get(&peer_id) {
                Some(session) => {
                    if let Err(e) = session.send(cmd).await {
                        warn!(peer = %peer_id, "Command not delivered: {}", e);
                    }
                }
                None => warn!(peer = %peer_id, "Command for unknown peer dropped"),
            },
            CallCommand::StartScreenShare {
                screen,
                ended,
                reply,
            } => {
                let result = self.start_screen_share(screen, ended).await;
                let _ = reply.send(result);
            }
            CallCommand::StopScreenShare { reply } => {
                if let Some(share) = self.screen_share.take() {
                    share.stop().await;
                }
                let _ = reply.send(());
            }
            CallCommand::Leave { reply } => {
                self.leave_room().await;
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn set_device(&mut self, kind: DeviceKind, enabled: bool) -> Result<(), CallError> {
        let toggle = self.media.set_enabled(kind, enabled).await?;

        match kind {
            DeviceKind::Camera => {
                if let Some(track) = toggle.new_track {
                    self.camera_pipeline.set_source(track).await?;
                }
                self.refresh_camera().await;
            }
            DeviceKind::Microphone => self.refresh_microphone().await,
        }

        info!(?kind, enabled, "Local device toggled");
        let state = self.device_state();
        self.broadcast(|| SessionCommand::DeviceState(state)).await;
        Ok(())
    }

    async fn set_background(&mut self, settings: VbgSettings) -> Result<(), CallError> {
        self.apply_camera_background(settings).await?;

        let applied = self.camera_pipeline.settings().clone();
        let state = self.device_state();
        self.broadcast(|| SessionCommand::Background(applied.clone()))
            .await;
        self.broadcast(|| SessionCommand::DeviceState(state)).await;
        Ok(())
    }

    async fn draw(&mut self, op: WhiteboardOp) {
        self.whiteboard.apply(&op);
        self.broadcast(|| SessionCommand::Whiteboard(WhiteboardMessage::Op { op: op.clone() }))
            .await;
        self.emit(CallEvent::Whiteboard(op));
    }

    async fn start_screen_share(
        &mut self,
        screen: MediaTrack,
        ended: oneshot::Receiver<()>,
    ) -> Result<watch::Receiver<ShareState>, CallError> {
        if self.is_sharing() {
            return Err(MediaError::Unavailable("a screen is already shared".to_owned()).into());
        }

        let controller = ScreenShareController::new(
            self.config.quality.clone(),
            self.config.capture.clone(),
            self.video.clone(),
            self.stats.clone(),
        );
        let handle = controller
            .spawn(screen, self.camera_tx.subscribe(), ended)
            .await?;
        let state = handle.state();
        self.screen_share = Some(handle);
        Ok(state)
    }
}
