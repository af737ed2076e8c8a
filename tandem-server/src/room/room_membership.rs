use crate::signaling::{Delivery, SignalingOutput};
use std::collections::{HashMap, HashSet};
use tandem_core::{ConnectionHandle, RoomKey, ServerMessage};
use tracing::debug;

/// Room key -> member set, with a reverse index enforcing one room per connection.
#[derive(Debug, Default)]
pub struct RoomMembership {
    rooms: HashMap<RoomKey, HashSet<ConnectionHandle>>,
    room_of: HashMap<ConnectionHandle, RoomKey>,
}

impl RoomMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `handle` to `room` and returns the other members. A handle that sits
    /// in a different room is moved out of it first.
    pub fn join(&mut self, room: RoomKey, handle: ConnectionHandle) -> Vec<ConnectionHandle> {
        if self.room_of.get(&handle).is_some_and(|current| current != &room) {
            self.leave(&handle);
        }

        let members = self.rooms.entry(room.clone()).or_default();
        members.insert(handle);
        self.room_of.insert(handle, room);

        members.iter().copied().filter(|m| *m != handle).collect()
    }

    /// Removes `handle` from whichever room holds it. Empty rooms are dropped.
    pub fn leave(&mut self, handle: &ConnectionHandle) -> Option<RoomKey> {
        let room = self.room_of.remove(handle)?;
        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(handle);
            if members.is_empty() {
                debug!("Room '{}' is empty, dropping it", room);
                self.rooms.remove(&room);
            }
        }
        Some(room)
    }

    pub fn room_of(&self, handle: &ConnectionHandle) -> Option<&RoomKey> {
        self.room_of.get(handle)
    }

    pub fn members(&self, room: &RoomKey) -> Vec<ConnectionHandle> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Hands `message` to every current member of `room` except `exclude`.
    /// Returns how many members had it queued.
    pub async fn broadcast(
        &self,
        output: &dyn SignalingOutput,
        room: &RoomKey,
        exclude: Option<ConnectionHandle>,
        message: &ServerMessage,
    ) -> usize {
        let mut queued = 0;
        for member in self.members(room) {
            if Some(member) == exclude {
                continue;
            }
            if output.deliver(member, message.clone()).await == Delivery::Queued {
                queued += 1;
            }
        }
        queued
    }
}
