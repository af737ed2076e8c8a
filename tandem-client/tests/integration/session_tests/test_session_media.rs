use std::time::Duration;
use tandem_client::{MediaStream, PeerEvent};
use tandem_core::IceCandidate;
use tokio::time::timeout;

use crate::integration::init_tracing;
use crate::utils::{MockTrack, SIGNAL_TIMEOUT, loopback, next_sent};

#[tokio::test]
async fn test_each_remote_track_publishes_a_new_snapshot() -> anyhow::Result<()> {
    init_tracing();
    let (mut alice, _bob) = loopback("alice@example.com", "bob@example.com");
    let mut remote = alice.handle.remote_stream.clone();

    alice.events.send(PeerEvent::Track(MockTrack::audio("a1")))?;
    timeout(SIGNAL_TIMEOUT, remote.changed()).await??;
    assert_eq!(remote.borrow_and_update().len(), 1);

    alice.events.send(PeerEvent::Track(MockTrack::video("v1")))?;
    timeout(SIGNAL_TIMEOUT, remote.changed()).await??;
    let ids: Vec<String> = remote
        .borrow_and_update()
        .tracks()
        .iter()
        .map(|t| t.id.clone())
        .collect();
    assert_eq!(ids, vec!["a1", "v1"]);

    alice.handle.close()?;
    Ok(())
}

#[tokio::test]
async fn test_negotiation_needed_before_call_sends_nothing() -> anyhow::Result<()> {
    init_tracing();
    let (mut alice, _bob) = loopback("alice@example.com", "bob@example.com");

    alice.events.send(PeerEvent::NegotiationNeeded)?;

    let nothing = timeout(Duration::from_millis(200), alice.sent.recv()).await;
    assert!(nothing.is_err(), "no offer may be sent before the call");
    Ok(())
}

#[tokio::test]
async fn test_local_candidates_are_relayed_to_remote() -> anyhow::Result<()> {
    init_tracing();
    let (mut alice, _bob) = loopback("alice@example.com", "bob@example.com");
    let candidate = IceCandidate {
        candidate: "candidate:1 1 udp 2122260223 10.0.0.3 6000 typ host".into(),
        sdp_mid: Some("0".into()),
        sdp_m_line_index: Some(0),
        username_fragment: None,
    };

    alice.events.send(PeerEvent::LocalCandidate(candidate.clone()))?;

    match next_sent(&mut alice).await? {
        tandem_core::ClientMessage::IceCandidate { to, candidate: sent } => {
            assert_eq!(to, "bob@example.com");
            assert_eq!(sent, candidate);
        }
        other => panic!("unexpected frame {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_attach_stream_reaches_peer() -> anyhow::Result<()> {
    init_tracing();
    let (alice, _bob) = loopback("alice@example.com", "bob@example.com");

    alice.handle.attach_stream(MediaStream::new(
        "cam",
        vec![MockTrack::audio("mic"), MockTrack::video("cam")],
    ))?;

    timeout(SIGNAL_TIMEOUT, async {
        while alice.peer.sender_tracks().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok(())
}
