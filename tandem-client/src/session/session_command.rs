use crate::media::MediaStream;

/// Application requests into a running session.
#[derive(Debug)]
pub enum SessionCommand<T> {
    /// Place the initial offer to the remote participant.
    Call,
    AttachStream(MediaStream<T>),
    Close,
}

/// Progress reported by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// The first offer/answer exchange completed.
    Established,
    /// An operation failed; the session stays usable for another attempt.
    Failed(String),
    Closed,
}
