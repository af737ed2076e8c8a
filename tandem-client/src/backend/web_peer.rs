use crate::error::BackendError;
use crate::peer::{MediaTrack, PeerConnection, PeerEvent, SenderSlot, SignalingState};
use async_trait::async_trait;
use js_sys::{Array, Promise, Reflect};
use tandem_core::{IceCandidate, IceServerConfig, MediaKind, SdpType, SessionDescription};
use tokio::sync::mpsc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    MediaStreamTrack, RtcConfiguration, RtcIceCandidateInit, RtcIceServer, RtcPeerConnection,
    RtcPeerConnectionIceEvent, RtcRtpSender, RtcSdpType, RtcSessionDescriptionInit,
    RtcSignalingState, RtcTrackEvent,
};

impl MediaTrack for MediaStreamTrack {
    fn id(&self) -> String {
        MediaStreamTrack::id(self)
    }

    fn kind(&self) -> Option<MediaKind> {
        MediaKind::parse(&MediaStreamTrack::kind(self))
    }
}

/// [`PeerConnection`] over the browser's `RTCPeerConnection`.
pub struct WebPeer {
    pc: RtcPeerConnection,
}

impl WebPeer {
    pub fn new(
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<PeerEvent<MediaStreamTrack>>,
    ) -> Result<Self, BackendError> {
        let rtc_config = RtcConfiguration::new();
        let ice_servers_arr = Array::new();
        for server_config in ice_servers {
            let rtc_ice_server = RtcIceServer::new();

            let urls = Array::new();
            for url in &server_config.urls {
                urls.push(&JsValue::from_str(url));
            }
            rtc_ice_server.set_urls(&urls);

            if let Some(username) = &server_config.username {
                rtc_ice_server.set_username(username);
            }
            if let Some(credential) = &server_config.credential {
                rtc_ice_server.set_credential(credential);
            }

            ice_servers_arr.push(&rtc_ice_server);
        }
        rtc_config.set_ice_servers(&ice_servers_arr);

        let pc = RtcPeerConnection::new_with_configuration(&rtc_config)?;

        let nn_tx = events.clone();
        let onnegotiationneeded = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let _ = nn_tx.send(PeerEvent::NegotiationNeeded);
        }) as Box<dyn FnMut(web_sys::Event)>);
        pc.set_onnegotiationneeded(Some(onnegotiationneeded.as_ref().unchecked_ref()));
        onnegotiationneeded.forget();

        let track_tx = events.clone();
        let ontrack = Closure::wrap(Box::new(move |ev: RtcTrackEvent| {
            let _ = track_tx.send(PeerEvent::Track(ev.track()));
        }) as Box<dyn FnMut(RtcTrackEvent)>);
        pc.set_ontrack(Some(ontrack.as_ref().unchecked_ref()));
        ontrack.forget();

        let ice_tx = events;
        let onice = Closure::wrap(Box::new(move |ev: RtcPeerConnectionIceEvent| {
            if let Some(candidate) = ev.candidate() {
                let _ = ice_tx.send(PeerEvent::LocalCandidate(IceCandidate {
                    candidate: candidate.candidate(),
                    sdp_mid: candidate.sdp_mid(),
                    sdp_m_line_index: candidate.sdp_m_line_index(),
                    username_fragment: candidate.username_fragment(),
                }));
            }
        }) as Box<dyn FnMut(RtcPeerConnectionIceEvent)>);
        pc.set_onicecandidate(Some(onice.as_ref().unchecked_ref()));
        onice.forget();

        Ok(Self { pc })
    }

    pub fn inner(&self) -> &RtcPeerConnection {
        &self.pc
    }
}

async fn description(promise: Promise, sdp_type: SdpType) -> Result<SessionDescription, BackendError> {
    let value = JsFuture::from(promise).await?;
    let sdp = Reflect::get(&value, &"sdp".into())?
        .as_string()
        .ok_or_else(|| BackendError::new("description without sdp"))?;
    Ok(SessionDescription { sdp_type, sdp })
}

fn to_init(desc: &SessionDescription) -> RtcSessionDescriptionInit {
    let sdp_type = match desc.sdp_type {
        SdpType::Offer => RtcSdpType::Offer,
        SdpType::Pranswer => RtcSdpType::Pranswer,
        SdpType::Answer => RtcSdpType::Answer,
        SdpType::Rollback => RtcSdpType::Rollback,
    };
    let init = RtcSessionDescriptionInit::new(sdp_type);
    if !desc.sdp.is_empty() {
        init.set_sdp(&desc.sdp);
    }
    init
}

#[async_trait(?Send)]
impl PeerConnection for WebPeer {
    type Track = MediaStreamTrack;
    type RemoteTrack = MediaStreamTrack;
    type Sender = RtcRtpSender;

    fn signaling_state(&self) -> SignalingState {
        match self.pc.signaling_state() {
            RtcSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
            RtcSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
            RtcSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
            RtcSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
            RtcSignalingState::Closed => SignalingState::Closed,
            _ => SignalingState::Stable,
        }
    }

    async fn create_offer(&self) -> Result<SessionDescription, BackendError> {
        description(self.pc.create_offer(), SdpType::Offer).await
    }

    async fn create_answer(&self) -> Result<SessionDescription, BackendError> {
        description(self.pc.create_answer(), SdpType::Answer).await
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), BackendError> {
        JsFuture::from(self.pc.set_local_description(&to_init(&desc))).await?;
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), BackendError> {
        JsFuture::from(self.pc.set_remote_description(&to_init(&desc))).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), BackendError> {
        let init = RtcIceCandidateInit::new(&candidate.candidate);
        init.set_sdp_mid(candidate.sdp_mid.as_deref());
        init.set_sdp_m_line_index(candidate.sdp_m_line_index);
        if let Some(ufrag) = candidate.username_fragment.as_deref() {
            init.set_username_fragment(Some(ufrag));
        }
        JsFuture::from(
            self.pc
                .add_ice_candidate_with_opt_rtc_ice_candidate_init(Some(&init)),
        )
        .await?;
        Ok(())
    }

    async fn senders(&self) -> Vec<SenderSlot<Self::Sender>> {
        self.pc
            .get_senders()
            .iter()
            .filter_map(|value| value.dyn_into::<RtcRtpSender>().ok())
            .map(|sender| {
                let track = sender.track();
                SenderSlot {
                    track_id: track.as_ref().map(|t| t.id()),
                    kind: track.as_ref().and_then(|t| MediaKind::parse(&t.kind())),
                    sender,
                }
            })
            .collect()
    }

    async fn replace_track(
        &self,
        sender: &Self::Sender,
        track: &Self::Track,
    ) -> Result<(), BackendError> {
        JsFuture::from(sender.replace_track(Some(track))).await?;
        Ok(())
    }

    async fn add_track(
        &self,
        track: &Self::Track,
        _stream_id: &str,
    ) -> Result<Self::Sender, BackendError> {
        let stream = web_sys::MediaStream::new()?;
        stream.add_track(track);
        Ok(self.pc.add_track_0(track, &stream))
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.pc.close();
        Ok(())
    }
}
