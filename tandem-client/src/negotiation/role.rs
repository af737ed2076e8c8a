use tandem_core::ParticipantId;

/// Glare-resolution role of one side of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Rolls back its own offer when offers collide.
    Polite,
    /// Keeps its own offer and drops the colliding one.
    Impolite,
}

impl Role {
    /// The lexicographically larger identity is polite. Both sides compute the
    /// same answer from the same pair, so exactly one of them is polite unless
    /// the identities are equal.
    pub fn for_pair(local: &ParticipantId, remote: &ParticipantId) -> Self {
        if local > remote {
            Self::Polite
        } else {
            Self::Impolite
        }
    }

    pub fn is_polite(&self) -> bool {
        matches!(self, Self::Polite)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatorConfig {
    pub local: ParticipantId,
    pub remote: ParticipantId,
}

impl NegotiatorConfig {
    pub fn new(local: impl Into<ParticipantId>, remote: impl Into<ParticipantId>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }

    pub fn role(&self) -> Role {
        Role::for_pair(&self.local, &self.remote)
    }
}
