use std::time::Duration;
use tandem_client::{
    PeerConnection, PeerEvent, Session, SessionConfig, SessionHandle, SessionUpdate, SignalingState,
};
use tandem_core::{ClientMessage, ParticipantId, ServerMessage};
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::mock_peer::{MockPeerConnection, MockTrack};

pub const SIGNAL_TIMEOUT: Duration = Duration::from_secs(5);

/// One side of a loopback call: the app handle, a clone of its peer, the
/// callback injector and a tap of everything it signalled.
pub struct LoopbackSide {
    pub handle: SessionHandle<MockTrack, MockTrack>,
    pub peer: MockPeerConnection,
    pub events: mpsc::UnboundedSender<PeerEvent<MockTrack>>,
    pub sent: mpsc::UnboundedReceiver<ClientMessage>,
}

/// Stamps `from` on each outbound frame and hands it to the other side, the
/// way the relay would. Every frame is also copied to `tap`.
fn relay(
    from: ParticipantId,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    target: mpsc::UnboundedSender<ServerMessage>,
    tap: mpsc::UnboundedSender<ClientMessage>,
) {
    tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let _ = tap.send(msg.clone());
            if let Some((_, relayed)) = msg.into_relay(from.clone()) {
                let _ = target.send(relayed);
            }
        }
    });
}

/// Spawns two sessions wired to each other through an in-process relay.
pub fn loopback(local: &str, remote: &str) -> (LoopbackSide, LoopbackSide) {
    let (a_in_tx, a_in_rx) = mpsc::unbounded_channel();
    let (b_in_tx, b_in_rx) = mpsc::unbounded_channel();

    let a = spawn_side(local, remote, a_in_rx, b_in_tx);
    let b = spawn_side(remote, local, b_in_rx, a_in_tx);
    (a, b)
}

fn spawn_side(
    local: &str,
    remote: &str,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    other_inbound: mpsc::UnboundedSender<ServerMessage>,
) -> LoopbackSide {
    let peer = MockPeerConnection::new(local);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (tap_tx, tap_rx) = mpsc::unbounded_channel();

    let config = SessionConfig {
        local: local.into(),
        remote: remote.into(),
        ice_servers: vec![],
    };
    let (session, handle) = Session::new(peer.clone(), &config, out_tx, event_rx, inbound);
    tokio::spawn(session.run());
    relay(local.into(), out_rx, other_inbound, tap_tx);

    LoopbackSide {
        handle,
        peer,
        events: event_tx,
        sent: tap_rx,
    }
}

pub async fn wait_for_update(
    handle: &mut SessionHandle<MockTrack, MockTrack>,
    expected: SessionUpdate,
) -> anyhow::Result<()> {
    loop {
        let update = timeout(SIGNAL_TIMEOUT, handle.next_update())
            .await?
            .ok_or_else(|| anyhow::anyhow!("session ended before {:?}", expected))?;
        if update == expected {
            return Ok(());
        }
        tracing::debug!("[Loopback] skipping update {:?}", update);
    }
}

pub async fn next_sent(side: &mut LoopbackSide) -> anyhow::Result<ClientMessage> {
    timeout(SIGNAL_TIMEOUT, side.sent.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("signaling tap closed"))
}

/// Polls until both peers are back in `stable`.
pub async fn wait_until_stable(a: &MockPeerConnection, b: &MockPeerConnection) -> anyhow::Result<()> {
    timeout(SIGNAL_TIMEOUT, async {
        while a.signaling_state() != SignalingState::Stable
            || b.signaling_state() != SignalingState::Stable
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}
