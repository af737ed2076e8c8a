use std::collections::HashMap;
use tandem_core::{ConnectionHandle, ParticipantId};

/// Bidirectional identity <-> connection mapping.
///
/// Each identity maps to at most one handle and each handle to at most one
/// identity; the most recent registration wins on both sides. Owned by the
/// router task, so it needs no locking of its own.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    by_identity: HashMap<ParticipantId, ConnectionHandle>,
    by_handle: HashMap<ConnectionHandle, ParticipantId>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_identity(&mut self, identity: ParticipantId, handle: ConnectionHandle) {
        if let Some(old_handle) = self.by_identity.insert(identity.clone(), handle) {
            if old_handle != handle {
                self.by_handle.remove(&old_handle);
            }
        }

        if let Some(old_identity) = self.by_handle.insert(handle, identity.clone()) {
            if old_identity != identity && self.by_identity.get(&old_identity) == Some(&handle) {
                self.by_identity.remove(&old_identity);
            }
        }
    }

    pub fn resolve_handle(&self, identity: &ParticipantId) -> Option<ConnectionHandle> {
        self.by_identity.get(identity).copied()
    }

    pub fn resolve_identity(&self, handle: &ConnectionHandle) -> Option<&ParticipantId> {
        self.by_handle.get(handle)
    }

    /// Forgets a closed connection. The identity entry is only dropped while it
    /// still points at `handle`, so a reconnect that already re-registered the
    /// identity elsewhere keeps its mapping.
    pub fn remove_handle(&mut self, handle: &ConnectionHandle) -> Option<ParticipantId> {
        let identity = self.by_handle.remove(handle)?;
        if self.by_identity.get(&identity) == Some(handle) {
            self.by_identity.remove(&identity);
        }
        Some(identity)
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }
}
