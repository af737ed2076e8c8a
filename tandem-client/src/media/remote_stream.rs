use crate::peer::MediaTrack;

/// Snapshot of every track the remote side has sent so far.
///
/// Snapshots are immutable; each inbound track produces a new one so that a
/// renderer holding the previous snapshot notices the change.
#[derive(Debug, Clone)]
pub struct RemoteStream<R> {
    tracks: Vec<R>,
}

impl<R: MediaTrack> RemoteStream<R> {
    pub fn empty() -> Self {
        Self { tracks: Vec::new() }
    }

    /// New snapshot with `track` appended. A track with an id already present
    /// replaces the old entry in place.
    pub fn with_track(&self, track: R) -> Self {
        let mut tracks = self.tracks.clone();
        let id = track.id();
        match tracks.iter().position(|t| t.id() == id) {
            Some(idx) => tracks[idx] = track,
            None => tracks.push(track),
        }
        Self { tracks }
    }

    pub fn tracks(&self) -> &[R] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl<R: MediaTrack> Default for RemoteStream<R> {
    fn default() -> Self {
        Self::empty()
    }
}
