use anyhow::Result;
use std::sync::Arc;
use tandem_client::backend::{LocalTrack, WebrtcPeer};
use tandem_client::{MediaStream, Negotiator, NegotiatorConfig, PeerConnection, SignalingState};
use tandem_core::{MediaKind, SdpType};
use tokio::sync::mpsc;
use webrtc::api::media_engine::MIME_TYPE_OPUS;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::integration::init_tracing;

async fn peer(local: &str, remote: &str) -> Result<Negotiator<WebrtcPeer>> {
    let (events, _rx) = mpsc::unbounded_channel();
    let peer = WebrtcPeer::new(&[], events).await?;
    Ok(Negotiator::new(peer, &NegotiatorConfig::new(local, remote)))
}

#[tokio::test]
async fn test_webrtc_peers_complete_offer_answer() -> Result<()> {
    init_tracing();
    let alice = peer("alice@example.com", "bob@example.com").await?;
    let bob = peer("bob@example.com", "alice@example.com").await?;
    alice.peer().inner().create_data_channel("chat", None).await?;

    let offer = alice.create_offer().await?;
    assert_eq!(offer.sdp_type, SdpType::Offer);
    assert!(offer.has_body());

    let answer = bob.create_answer(offer).await?;
    assert_eq!(answer.sdp_type, SdpType::Answer);
    alice.set_remote_answer(answer).await?;

    assert_eq!(alice.signaling_state(), SignalingState::Stable);
    assert_eq!(bob.signaling_state(), SignalingState::Stable);

    alice.close().await?;
    bob.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_webrtc_senders_report_track_kind() -> Result<()> {
    init_tracing();
    let alice = peer("alice@example.com", "bob@example.com").await?;
    let mic: LocalTrack = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            ..Default::default()
        },
        "mic-1".to_owned(),
        "cam".to_owned(),
    ));
    let stream = MediaStream::new("cam", vec![mic]);

    assert_eq!(alice.attach_stream(&stream).await?, 1);
    assert_eq!(alice.attach_stream(&stream).await?, 0);

    let senders = alice.peer().senders().await;
    assert_eq!(senders.len(), 1);
    assert_eq!(senders[0].track_id.as_deref(), Some("mic-1"));
    assert_eq!(senders[0].kind, Some(MediaKind::Audio));

    alice.close().await?;
    Ok(())
}
