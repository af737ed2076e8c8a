use tandem_client::{NegotiationError, Role, SignalingState};
use tandem_core::SdpType;

use crate::integration::{init_tracing, negotiator};

// "alice" < "bob": alice is impolite, bob is polite.

#[tokio::test]
async fn test_roles_are_complementary() {
    let (alice, _) = negotiator("alice@example.com", "bob@example.com");
    let (bob, _) = negotiator("bob@example.com", "alice@example.com");

    assert_eq!(alice.role(), Role::Impolite);
    assert_eq!(bob.role(), Role::Polite);
}

#[tokio::test]
async fn test_crossed_offers_converge_on_impolite_offer() {
    init_tracing();
    let (alice, alice_peer) = negotiator("alice@example.com", "bob@example.com");
    let (bob, bob_peer) = negotiator("bob@example.com", "alice@example.com");

    let (alice_offer, bob_offer) = tokio::join!(alice.create_offer(), bob.create_offer());
    let alice_offer = alice_offer.unwrap();
    let bob_offer = bob_offer.unwrap();

    let (at_alice, at_bob) = tokio::join!(
        alice.handle_description(bob_offer),
        bob.handle_description(alice_offer.clone())
    );
    assert_eq!(at_alice.unwrap(), None, "impolite side must drop the colliding offer");
    let answer = at_bob.unwrap().expect("polite side must answer");
    assert_eq!(bob_peer.rollbacks(), 1);
    assert_eq!(alice_peer.rollbacks(), 0);

    alice.handle_description(answer).await.unwrap();

    assert_eq!(alice.signaling_state(), SignalingState::Stable);
    assert_eq!(bob.signaling_state(), SignalingState::Stable);
    assert_eq!(bob_peer.remote_description(), Some(alice_offer.clone()));
    assert_eq!(alice_peer.local_description(), Some(alice_offer));
    assert_eq!(
        bob_peer.local_description().map(|d| d.sdp_type),
        Some(SdpType::Answer),
        "polite side must not keep its stale offer"
    );
}

#[tokio::test]
async fn test_impolite_ignores_offer_while_making_its_own() {
    init_tracing();
    let (alice, alice_peer) = negotiator("alice@example.com", "bob@example.com");
    let (bob, _) = negotiator("bob@example.com", "alice@example.com");
    let bob_offer = bob.create_offer().await.unwrap();

    let gate = alice_peer.hold_next_offer();
    let (offer, ignored) = tokio::join!(alice.create_offer(), async {
        while !alice.is_making_offer() {
            tokio::task::yield_now().await;
        }
        let result = alice.create_answer(bob_offer).await;
        gate.notify_one();
        result
    });

    assert!(matches!(ignored, Err(NegotiationError::OfferIgnored)));
    offer.unwrap();
    assert_eq!(alice.signaling_state(), SignalingState::HaveLocalOffer);
    assert_eq!(alice_peer.remote_description(), None);
}

#[tokio::test]
async fn test_polite_accepts_offer_while_making_its_own() {
    init_tracing();
    let (alice, _) = negotiator("alice@example.com", "bob@example.com");
    let (bob, bob_peer) = negotiator("bob@example.com", "alice@example.com");
    let alice_offer = alice.create_offer().await.unwrap();

    let gate = bob_peer.hold_next_offer();
    let (superseded, answered) = tokio::join!(bob.create_offer(), async {
        while !bob.is_making_offer() {
            tokio::task::yield_now().await;
        }
        let result = bob.create_answer(alice_offer.clone()).await;
        gate.notify_one();
        result
    });

    let answer = answered.unwrap();
    assert!(matches!(superseded, Err(NegotiationError::OfferSuperseded)));
    assert_eq!(bob_peer.remote_description(), Some(alice_offer));
    assert!(!bob.is_making_offer());
    assert_eq!(bob.signaling_state(), SignalingState::Stable);

    alice.set_remote_answer(answer).await.unwrap();
    assert_eq!(alice.signaling_state(), SignalingState::Stable);
}

#[tokio::test]
async fn test_polite_answer_waits_for_local_offer_being_applied() {
    init_tracing();
    let (alice, _) = negotiator("alice@example.com", "bob@example.com");
    let (bob, bob_peer) = negotiator("bob@example.com", "alice@example.com");
    let alice_offer = alice.create_offer().await.unwrap();

    let gate = bob_peer.hold_next_set_local();
    let (offered, answered) = tokio::join!(bob.create_offer(), async {
        gate.entered.notified().await;
        let (answer, ()) = tokio::join!(bob.create_answer(alice_offer.clone()), async {
            tokio::task::yield_now().await;
            gate.release.notify_one();
        });
        answer
    });

    offered.unwrap();
    let answer = answered.unwrap();
    assert_eq!(bob_peer.rollbacks(), 1, "polite side must drop its applied offer");
    assert_eq!(bob_peer.remote_description(), Some(alice_offer));

    alice.set_remote_answer(answer).await.unwrap();
    assert_eq!(alice.signaling_state(), SignalingState::Stable);
    assert_eq!(bob.signaling_state(), SignalingState::Stable);
}

#[tokio::test]
async fn test_polite_converges_for_every_interleaving() {
    init_tracing();
    for spins in 0..6 {
        let (alice, _) = negotiator("alice@example.com", "bob@example.com");
        let (bob, bob_peer) = negotiator("bob@example.com", "alice@example.com");
        let alice_offer = alice.create_offer().await.unwrap();

        let (offered, answered) = tokio::join!(bob.create_offer(), async {
            while !bob.is_making_offer() {
                tokio::task::yield_now().await;
            }
            for _ in 0..spins {
                tokio::task::yield_now().await;
            }
            bob.create_answer(alice_offer.clone()).await
        });

        assert!(
            matches!(offered, Ok(_) | Err(NegotiationError::OfferSuperseded)),
            "spins={spins}: {offered:?}"
        );
        let answer = answered.unwrap_or_else(|e| panic!("spins={spins}: {e}"));
        assert_eq!(bob_peer.remote_description(), Some(alice_offer));

        alice.set_remote_answer(answer).await.unwrap();
        assert_eq!(alice.signaling_state(), SignalingState::Stable, "spins={spins}");
        assert_eq!(bob.signaling_state(), SignalingState::Stable, "spins={spins}");
    }
}
