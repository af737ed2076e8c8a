use crate::error::BackendError;
use crate::peer::{MediaTrack, PeerConnection, PeerEvent, SenderSlot, SignalingState};
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{IceCandidate, IceServerConfig, MediaKind, SdpType, SessionDescription};
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

pub type LocalTrack = Arc<dyn TrackLocal + Send + Sync>;

impl MediaTrack for LocalTrack {
    fn id(&self) -> String {
        TrackLocal::id(self.as_ref()).to_string()
    }

    fn kind(&self) -> Option<MediaKind> {
        media_kind(TrackLocal::kind(self.as_ref()))
    }
}

impl MediaTrack for Arc<TrackRemote> {
    fn id(&self) -> String {
        TrackRemote::id(self.as_ref()).to_string()
    }

    fn kind(&self) -> Option<MediaKind> {
        media_kind(TrackRemote::kind(self.as_ref()))
    }
}

fn media_kind(codec: RTPCodecType) -> Option<MediaKind> {
    match codec {
        RTPCodecType::Audio => Some(MediaKind::Audio),
        RTPCodecType::Video => Some(MediaKind::Video),
        _ => None,
    }
}

/// [`PeerConnection`] over the `webrtc` crate.
pub struct WebrtcPeer {
    pc: Arc<RTCPeerConnection>,
}

impl WebrtcPeer {
    /// Builds the connection and wires its callbacks into `events`.
    pub async fn new(
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<PeerEvent<Arc<TrackRemote>>>,
    ) -> Result<Self, BackendError> {
        // 1. Codecs and interceptors (RTCP reports, NACK)
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        // 2. API object
        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        // 3. ICE servers as handed out by the relay
        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        // 4. The connection itself
        let pc = Arc::new(api.new_peer_connection(rtc_config).await?);

        // Callbacks below only forward into `events`; the session decides.

        // A. Connection state, log only

        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            Box::pin(async move {
                info!("Peer connection state changed: {:?}", s);
            })
        }));

        // B. Renegotiation trigger
        let nn_tx = events.clone();
        pc.on_negotiation_needed(Box::new(move || {
            let tx = nn_tx.clone();
            Box::pin(async move {
                let _ = tx.send(PeerEvent::NegotiationNeeded);
            })
        }));

        // C. Remote tracks
        let track_tx = events.clone();
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                Box::pin(async move {
                    debug!("Remote track {} arrived", track.id());
                    let _ = tx.send(PeerEvent::Track(track));
                })
            },
        ));

        // D. Trickle ICE: local candidates go out through signaling
        let ice_tx = events;
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx.send(PeerEvent::LocalCandidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        Ok(Self { pc })
    }

    pub fn inner(&self) -> &Arc<RTCPeerConnection> {
        &self.pc
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, BackendError> {
    let rtc = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpType::Rollback => {
            return Err(BackendError::new("rollback is applied through rollback()"));
        }
    };
    Ok(rtc)
}

fn from_rtc(desc: RTCSessionDescription) -> SessionDescription {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        _ => SdpType::Offer,
    };
    SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    }
}

#[async_trait]
impl PeerConnection for WebrtcPeer {
    type Track = LocalTrack;
    type RemoteTrack = Arc<TrackRemote>;
    type Sender = Arc<RTCRtpSender>;

    fn signaling_state(&self) -> SignalingState {
        match self.pc.signaling_state() {
            RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
            RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
            RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
            RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
            RTCSignalingState::Closed => SignalingState::Closed,
            _ => SignalingState::Stable,
        }
    }

    async fn create_offer(&self) -> Result<SessionDescription, BackendError> {
        Ok(from_rtc(self.pc.create_offer(None).await?))
    }

    async fn create_answer(&self) -> Result<SessionDescription, BackendError> {
        Ok(from_rtc(self.pc.create_answer(None).await?))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), BackendError> {
        if desc.sdp_type == SdpType::Rollback {
            return self.rollback().await;
        }
        self.pc.set_local_description(to_rtc(desc)?).await?;
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), BackendError> {
        self.pc.set_remote_description(to_rtc(desc)?).await?;
        Ok(())
    }

    /// The crate parses the body of a rollback description, so the pending
    /// offer is replayed with its type switched.
    async fn rollback(&self) -> Result<(), BackendError> {
        let Some(mut pending) = self.pc.pending_local_description().await else {
            return Err(BackendError::new("no pending local description to roll back"));
        };
        pending.sdp_type = RTCSdpType::Rollback;
        self.pc.set_local_description(pending).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), BackendError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.pc.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn senders(&self) -> Vec<SenderSlot<Self::Sender>> {
        let mut slots = Vec::new();
        for sender in self.pc.get_senders().await {
            let track = sender.track().await;
            slots.push(SenderSlot {
                track_id: track.as_ref().map(MediaTrack::id),
                kind: track.as_ref().and_then(MediaTrack::kind),
                sender,
            });
        }
        slots
    }

    async fn replace_track(
        &self,
        sender: &Self::Sender,
        track: &Self::Track,
    ) -> Result<(), BackendError> {
        sender.replace_track(Some(Arc::clone(track))).await?;
        Ok(())
    }

    /// The stream id is fixed when a `webrtc` track is built, so `_stream_id`
    /// is not used here.
    async fn add_track(
        &self,
        track: &Self::Track,
        _stream_id: &str,
    ) -> Result<Self::Sender, BackendError> {
        Ok(self.pc.add_track(Arc::clone(track)).await?)
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.pc.close().await?;
        Ok(())
    }
}
