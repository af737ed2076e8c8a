use crate::config::{RelayConfig, UnreachablePolicy};
use crate::registry::IdentityRegistry;
use crate::room::RoomMembership;
use crate::router::RouterCommand;
use crate::signaling::{Delivery, SignalingOutput};
use std::collections::HashSet;
use std::sync::Arc;
use tandem_core::{
    ClientMessage, ConnectionHandle, Member, ParticipantId, RoomKey, ServerMessage,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The single owner of the Identity Registry and Room Membership. Every
/// mutation is a command processed in arrival order.
pub struct Router {
    registry: IdentityRegistry,
    rooms: RoomMembership,
    live: HashSet<ConnectionHandle>,
    command_rx: mpsc::Receiver<RouterCommand>,
    output: Arc<dyn SignalingOutput>,
    config: RelayConfig,
}

impl Router {
    pub fn new(
        command_rx: mpsc::Receiver<RouterCommand>,
        output: Arc<dyn SignalingOutput>,
        config: RelayConfig,
    ) -> Self {
        Self {
            registry: IdentityRegistry::new(),
            rooms: RoomMembership::new(),
            live: HashSet::new(),
            command_rx,
            output,
            config,
        }
    }

    pub async fn run(mut self) {
        info!("Signaling router started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Command channel closed. Signaling router finished");
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomMembership {
        &self.rooms
    }

    pub fn is_live(&self, handle: &ConnectionHandle) -> bool {
        self.live.contains(handle)
    }

    pub async fn handle_command(&mut self, cmd: RouterCommand) {
        match cmd {
            RouterCommand::Connect { handle } => {
                info!("Connection {} accepted", handle);
                // Handshake: the handle first, then the ICE list
                self.live.insert(handle);
                self.send(handle, ServerMessage::Welcome { handle }).await;
                let ice_servers = self.config.ice_servers.clone();
                self.send(handle, ServerMessage::IceConfig { ice_servers })
                    .await;
            }

            RouterCommand::Inbound { handle, text } => {
                if !self.live.contains(&handle) {
                    debug!("Ignoring frame from unknown connection {}", handle);
                    return;
                }
                match ClientMessage::decode(&text) {
                    Ok(msg) => self.handle_message(handle, msg).await,
                    Err(e) => self.reject(handle, e.to_string()).await,
                }
            }

            RouterCommand::Disconnect { handle } => {
                if !self.live.remove(&handle) {
                    return;
                }
                // Leave first: the user-left notice needs the identity the
                // registry is about to forget.
                self.leave_room(handle).await;
                match self.registry.remove_handle(&handle) {
                    Some(identity) => info!("Connection {} ({}) closed", handle, identity),
                    None => info!("Connection {} closed", handle),
                }
            }
        }
    }

    async fn handle_message(&mut self, handle: ConnectionHandle, msg: ClientMessage) {
        match msg {
            ClientMessage::Join { identity, room } => self.join(handle, identity, room).await,
            ClientMessage::Leave => self.leave_room(handle).await,
            relay => self.relay(handle, relay).await,
        }
    }

    async fn join(&mut self, handle: ConnectionHandle, identity: ParticipantId, room: RoomKey) {
        // 1. Moving rooms, or renaming in place, reads as a leave to whoever
        //    saw the old membership.
        let renamed = self
            .registry
            .resolve_identity(&handle)
            .is_some_and(|current| current != &identity);
        if self
            .rooms
            .room_of(&handle)
            .is_some_and(|current| current != &room || renamed)
        {
            self.leave_room(handle).await;
        }

        // 2. Register and join
        self.registry.register_identity(identity.clone(), handle);
        let others = self.rooms.join(room.clone(), handle);
        info!("{} joined room '{}' as {}", identity, room, handle);

        // 3. Ack to the joiner with who is already there

        let members = others
            .into_iter()
            .filter_map(|other| {
                self.registry.resolve_identity(&other).map(|id| Member {
                    identity: id.clone(),
                    handle: other,
                })
            })
            .collect();

        self.send(
            handle,
            ServerMessage::Join {
                identity: identity.clone(),
                room: room.clone(),
                members,
            },
        )
        .await;

        // 4. Announce to everyone else
        let announce = ServerMessage::UserJoined { identity, handle };
        self.rooms
            .broadcast(self.output.as_ref(), &room, Some(handle), &announce)
            .await;
    }

    async fn leave_room(&mut self, handle: ConnectionHandle) {
        let Some(room) = self.rooms.leave(&handle) else {
            return;
        };
        let Some(identity) = self.registry.resolve_identity(&handle).cloned() else {
            return;
        };
        info!("{} left room '{}'", identity, room);

        let notice = ServerMessage::UserLeft { identity, handle };
        self.rooms
            .broadcast(self.output.as_ref(), &room, None, &notice)
            .await;
    }

    async fn relay(&mut self, handle: ConnectionHandle, msg: ClientMessage) {
        let kind = msg.kind();
        // 1. Only joined connections have an identity to stamp as `from`
        let Some(from) = self.registry.resolve_identity(&handle).cloned() else {
            self.reject(handle, format!("join required before {kind}"))
                .await;
            return;
        };
        let Some((to, relayed)) = msg.into_relay(from.clone()) else {
            return;
        };

        // 2. Resolve the target
        let Some(target) = self.resolve_target(&to) else {
            self.unreachable(handle, to).await;
            return;
        };

        // 3. Hand off without waiting on the recipient
        match self.output.deliver(target, relayed).await {
            Delivery::Queued => debug!("Relayed {} from {} to {}", kind, from, to),
            Delivery::Dropped => warn!("Dropped {} from {} to {}: queue full", kind, from, to),
            Delivery::Closed => self.unreachable(handle, to).await,
        }
    }

    /// `to` is an identity first, then the text form of a live handle.
    fn resolve_target(&self, to: &str) -> Option<ConnectionHandle> {
        if let Some(handle) = self.registry.resolve_handle(&ParticipantId::from(to)) {
            return Some(handle);
        }
        to.parse::<ConnectionHandle>()
            .ok()
            .filter(|handle| self.live.contains(handle))
    }

    async fn unreachable(&self, sender: ConnectionHandle, to: String) {
        warn!("Relay target '{}' is unreachable", to);
        if self.config.unreachable == UnreachablePolicy::Notify {
            self.send(sender, ServerMessage::TargetUnreachable { to })
                .await;
        }
    }

    async fn reject(&self, handle: ConnectionHandle, reason: String) {
        warn!("Rejected frame from {}: {}", handle, reason);
        if self.config.notify_malformed {
            self.send(handle, ServerMessage::Error { reason }).await;
        }
    }

    async fn send(&self, handle: ConnectionHandle, msg: ServerMessage) {
        if self.output.deliver(handle, msg).await != Delivery::Queued {
            debug!("Frame for {} was not queued", handle);
        }
    }
}
