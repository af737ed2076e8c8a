use tandem_core::ServerMessage;

use crate::integration::{create_harness, create_notifying_harness};
use crate::utils::call_offer;

#[tokio::test]
async fn test_unknown_identity_is_dropped_silently() {
    let mut relay = create_harness();
    let alice = relay.joined("alice@example.com", "room1").await;

    relay.send(alice, call_offer("nobody@example.com")).await;

    assert_eq!(relay.output.total().await, 0);
}

#[tokio::test]
async fn test_unknown_identity_is_reported_under_notify_policy() {
    let mut relay = create_notifying_harness();
    let alice = relay.joined("alice@example.com", "room1").await;

    relay.send(alice, call_offer("nobody@example.com")).await;

    assert_eq!(
        relay.output.delivered_to(alice).await,
        vec![ServerMessage::TargetUnreachable {
            to: "nobody@example.com".into(),
        }]
    );
}

#[tokio::test]
async fn test_disconnected_target_is_unreachable() {
    let mut relay = create_notifying_harness();
    let alice = relay.joined("alice@example.com", "room1").await;
    let bob = relay.joined("bob@example.com", "room1").await;
    relay.disconnect(bob).await;
    relay.output.clear().await;

    relay.send(alice, call_offer("bob@example.com")).await;
    relay.send(alice, call_offer(&bob.to_string())).await;

    assert_eq!(
        relay.output.delivered_to(alice).await,
        vec![
            ServerMessage::TargetUnreachable {
                to: "bob@example.com".into(),
            },
            ServerMessage::TargetUnreachable {
                to: bob.to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_closed_output_counts_as_unreachable() {
    let mut relay = create_notifying_harness();
    let alice = relay.joined("alice@example.com", "room1").await;
    let bob = relay.joined("bob@example.com", "room1").await;
    relay.output.mark_closed(bob).await;

    relay.send(alice, call_offer("bob@example.com")).await;

    assert_eq!(
        relay.output.delivered_to(alice).await,
        vec![ServerMessage::TargetUnreachable {
            to: "bob@example.com".into(),
        }]
    );
}
