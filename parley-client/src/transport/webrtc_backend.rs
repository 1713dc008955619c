use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::media::{MediaTrack, TrackKind, TrackSource};
use crate::transport::{
    ControlChannel, MediaSender, PeerConnectionState, PeerTransport, SignalingState,
    TransportEvent, TransportFactory,
};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use parley_core::{EncoderParams, IceCandidate, PeerId, SdpType, SessionDescription, StatsSample};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::api::{API, APIBuilder};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::stats::StatsReportType;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const STREAM_ID: &str = "parley-local";

/// Where the host writes encoded samples for a local track, and reads the
/// encoder parameters currently requested for it.
#[derive(Clone)]
pub struct LocalSink {
    pub track: Arc<TrackLocalStaticSample>,
    pub encoder: watch::Receiver<Option<EncoderParams>>,
}

/// Builds webrtc-rs peer connections.
pub struct WebRtcFactory {
    api: API,
    config: TransportConfig,
    sinks: Arc<DashMap<String, LocalSink>>,
}

impl WebRtcFactory {
    pub fn new(config: TransportConfig) -> Result<Self> {
        // Codecs are registered even for data-only sessions.
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self {
            api,
            config,
            sinks: Arc::new(DashMap::new()),
        })
    }

    /// Sample sink of a local track previously attached or swapped in.
    pub fn sink(&self, track_id: &str) -> Option<LocalSink> {
        self.sinks.get(track_id).map(|sink| sink.clone())
    }
}

#[async_trait]
impl TransportFactory for WebRtcFactory {
    async fn create(
        &self,
        remote: &PeerId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>, TransportError> {
        let rtc_config = RTCConfiguration {
            ice_servers: self
                .config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(self.api.new_peer_connection(rtc_config).await?);
        let transport = WebRtcTransport::wire(
            remote.clone(),
            peer_connection,
            events,
            self.sinks.clone(),
        );
        Ok(Arc::new(transport))
    }
}

pub struct WebRtcTransport {
    remote: PeerId,
    peer_connection: Arc<RTCPeerConnection>,
    events: mpsc::Sender<TransportEvent>,
    sinks: Arc<DashMap<String, LocalSink>>,
    /// Cumulative (packets sent, packets lost) at the previous sample.
    counters: Mutex<(u64, i64)>,
}

impl WebRtcTransport {
    fn wire(
        remote: PeerId,
        peer_connection: Arc<RTCPeerConnection>,
        events: mpsc::Sender<TransportEvent>,
        sinks: Arc<DashMap<String, LocalSink>>,
    ) -> Self {
        let state_tx = events.clone();
        let state_peer = remote.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let peer = state_peer.clone();

                Box::pin(async move {
                    info!("Peer connection state changed for {}: {:?}", peer, s);
                    let state = match s {
                        RTCPeerConnectionState::New | RTCPeerConnectionState::Unspecified => {
                            PeerConnectionState::New
                        }
                        RTCPeerConnectionState::Connecting => PeerConnectionState::Connecting,
                        RTCPeerConnectionState::Connected => PeerConnectionState::Connected,
                        RTCPeerConnectionState::Disconnected => PeerConnectionState::Disconnected,
                        RTCPeerConnectionState::Failed => PeerConnectionState::Failed,
                        RTCPeerConnectionState::Closed => PeerConnectionState::Closed,
                    };
                    let _ = tx.send(TransportEvent::ConnectionState(state)).await;
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                };
                let _ = tx.send(TransportEvent::LocalCandidate(candidate)).await;
            })
        }));

        let nn_tx = events.clone();
        peer_connection.on_negotiation_needed(Box::new(move || {
            let tx = nn_tx.clone();
            Box::pin(async move {
                let _ = tx.send(TransportEvent::NegotiationNeeded).await;
            })
        }));

        // The answering side receives the control channel from the offerer.
        let dc_tx = events.clone();
        let dc_peer = remote.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            let peer = dc_peer.clone();

            Box::pin(async move {
                debug!("New DataChannel '{}' from {}", dc.label(), peer);
                wire_data_channel(dc, tx).await;
            })
        }));

        let track_tx = events.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    _ => TrackKind::Video,
                };
                let handle = MediaTrack {
                    id: track.id(),
                    kind,
                    source: TrackSource::Remote,
                    width: None,
                    height: None,
                };
                let _ = tx.send(TransportEvent::RemoteTrack(handle)).await;
            })
        }));

        Self {
            remote,
            peer_connection,
            events,
            sinks,
            counters: Mutex::new((0, 0)),
        }
    }

    fn sample_track(&self, track: &MediaTrack) -> Arc<TrackLocalStaticSample> {
        let capability = match track.kind {
            TrackKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                sdp_fmtp_line: String::new(),
                rtcp_feedback: vec![],
            },
            TrackKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                channels: 0,
                sdp_fmtp_line: String::new(),
                rtcp_feedback: vec![],
            },
        };
        Arc::new(TrackLocalStaticSample::new(
            capability,
            track.id.clone(),
            STREAM_ID.to_owned(),
        ))
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, TransportError> {
    let rtc = match desc.kind {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpType::Rollback => rollback_description(desc.sdp)?,
    };
    Ok(rtc)
}

fn rollback_description(sdp: String) -> Result<RTCSessionDescription, TransportError> {
    serde_json::from_value(serde_json::json!({ "type": "rollback", "sdp": sdp }))
        .map_err(|e| TransportError::PeerConnection(e.to_string()))
}

fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription, TransportError> {
    let kind = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        other => {
            return Err(TransportError::PeerConnection(format!(
                "unexpected local description type {}",
                other
            )));
        }
    };
    Ok(SessionDescription {
        kind,
        sdp: desc.sdp,
    })
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_offer(&self, ice_restart: bool) -> Result<SessionDescription, TransportError> {
        let options = RTCOfferOptions {
            ice_restart,
            ..Default::default()
        };
        let offer = self.peer_connection.create_offer(Some(options)).await?;
        from_rtc(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription, TransportError> {
        let answer = self.peer_connection.create_answer(None).await?;
        from_rtc(answer)
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        self.peer_connection
            .set_local_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), TransportError> {
        self.peer_connection
            .set_remote_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), TransportError> {
        let sdp = self
            .peer_connection
            .local_description()
            .await
            .map(|d| d.sdp)
            .unwrap_or_default();
        self.peer_connection
            .set_local_description(rollback_description(sdp)?)
            .await?;
        debug!("Rolled back local offer for {}", self.remote);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    fn signaling_state(&self) -> SignalingState {
        match self.peer_connection.signaling_state() {
            RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
            RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
            RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
            RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
            RTCSignalingState::Closed => SignalingState::Closed,
            _ => SignalingState::Stable,
        }
    }

    async fn has_remote_description(&self) -> bool {
        self.peer_connection.remote_description().await.is_some()
    }

    async fn create_control_channel(&self, label: &str) -> Result<(), TransportError> {
        let init = RTCDataChannelInit {
            ordered: Some(true),
            ..Default::default()
        };
        let dc = self
            .peer_connection
            .create_data_channel(label, Some(init))
            .await?;
        wire_data_channel(dc, self.events.clone()).await;
        Ok(())
    }

    async fn attach_track(
        &self,
        track: MediaTrack,
    ) -> Result<Arc<dyn MediaSender>, TransportError> {
        let local = self.sample_track(&track);
        let rtp_sender = self
            .peer_connection
            .add_track(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        let (encoder_tx, encoder_rx) = watch::channel(None);
        self.sinks.insert(
            track.id.clone(),
            LocalSink {
                track: Arc::clone(&local),
                encoder: encoder_rx,
            },
        );

        Ok(Arc::new(WebRtcMediaSender {
            transport_sinks: self.sinks.clone(),
            rtp_sender,
            encoder: encoder_tx,
            codec_source: local,
        }))
    }

    async fn stats(&self) -> Option<StatsSample> {
        let report = self.peer_connection.get_stats().await;
        let mut packets_sent: u64 = 0;
        let mut packets_lost: i64 = 0;
        let mut rtt: Option<f64> = None;

        for stat in report.reports.values() {
            if let StatsReportType::OutboundRTP(rtp) = stat
                && rtp.kind == "video"
            {
                packets_sent = rtp.packets_sent;
            }
            if let StatsReportType::RemoteInboundRTP(remote) = stat
                && remote.kind == "video"
            {
                packets_lost = remote.packets_lost;
                if remote.round_trip_time.is_some() {
                    rtt = remote.round_trip_time;
                }
            }
        }

        let rtt = rtt?;
        let Ok(mut counters) = self.counters.lock() else {
            return None;
        };
        let sent = packets_sent.saturating_sub(counters.0);
        let lost = packets_lost.saturating_sub(counters.1).max(0);
        *counters = (packets_sent, packets_lost);

        let packet_loss_pct = if sent > 0 {
            lost as f64 / sent as f64 * 100.0
        } else {
            0.0
        };
        Some(StatsSample {
            packet_loss_pct,
            rtt_ms: (rtt * 1000.0).round() as u32,
        })
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

async fn wire_data_channel(dc: Arc<RTCDataChannel>, tx: mpsc::Sender<TransportEvent>) {
    let dc_on_open = dc.clone();
    let tx_open = tx.clone();
    dc.on_open(Box::new(move || {
        let tx = tx_open.clone();
        let channel = WebRtcControlChannel {
            label: dc_on_open.label().to_owned(),
            dc: dc_on_open.clone(),
        };

        Box::pin(async move {
            info!("DataChannel '{}' open", channel.label);
            let _ = tx
                .send(TransportEvent::ControlOpen(Arc::new(channel)))
                .await;
        })
    }));

    let tx_msg = tx.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx_msg.clone();
        Box::pin(async move {
            if !msg.is_string {
                warn!("Ignoring binary frame on control channel");
                return;
            }
            match String::from_utf8(msg.data.to_vec()) {
                Ok(text) => {
                    let _ = tx.send(TransportEvent::ControlMessage(text)).await;
                }
                Err(e) => warn!("Control frame is not UTF-8: {}", e),
            }
        })
    }));

    let tx_close = tx.clone();
    dc.on_close(Box::new(move || {
        let tx = tx_close.clone();
        Box::pin(async move {
            let _ = tx.send(TransportEvent::ControlClosed).await;
        })
    }));

    let tx_low = tx;
    dc.on_buffered_amount_low(Box::new(move || {
        let tx = tx_low.clone();
        Box::pin(async move {
            let _ = tx.send(TransportEvent::BufferedAmountLow).await;
        })
    }))
    .await;
}

pub struct WebRtcControlChannel {
    label: String,
    dc: Arc<RTCDataChannel>,
}

#[async_trait]
impl ControlChannel for WebRtcControlChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_open(&self) -> bool {
        self.dc.ready_state() == RTCDataChannelState::Open
    }

    async fn send_text(&self, text: String) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::ChannelClosed);
        }
        self.dc.send_text(text).await?;
        Ok(())
    }

    async fn buffered_amount(&self) -> usize {
        self.dc.buffered_amount().await
    }

    async fn set_low_water_mark(&self, bytes: usize) {
        self.dc.set_buffered_amount_low_threshold(bytes).await;
    }

    async fn close(&self) {
        if let Err(e) = self.dc.close().await {
            debug!("DataChannel close: {}", e);
        }
    }
}

pub struct WebRtcMediaSender {
    transport_sinks: Arc<DashMap<String, LocalSink>>,
    rtp_sender: Arc<RTCRtpSender>,
    encoder: watch::Sender<Option<EncoderParams>>,
    /// Template for replacement tracks, so they keep the negotiated codec.
    codec_source: Arc<TrackLocalStaticSample>,
}

#[async_trait]
impl MediaSender for WebRtcMediaSender {
    async fn replace_track(&self, track: Option<MediaTrack>) -> Result<(), TransportError> {
        let Some(track) = track else {
            self.rtp_sender.replace_track(None).await?;
            return Ok(());
        };

        let local = Arc::new(TrackLocalStaticSample::new(
            self.codec_source.codec(),
            track.id.clone(),
            STREAM_ID.to_owned(),
        ));
        self.rtp_sender
            .replace_track(Some(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>))
            .await?;
        self.transport_sinks.insert(
            track.id,
            LocalSink {
                track: local,
                encoder: self.encoder.subscribe(),
            },
        );
        Ok(())
    }

    async fn set_encoding(&self, params: Option<EncoderParams>) -> Result<(), TransportError> {
        // webrtc-rs has no encodings API; the host encoder watches this value.
        self.encoder.send_replace(params);
        Ok(())
    }
}
