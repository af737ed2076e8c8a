use crate::peer::MediaTrack;
use tandem_core::MediaKind;

/// Local capture output handed to [`crate::Negotiator::attach_stream`].
#[derive(Debug, Clone)]
pub struct MediaStream<T> {
    pub id: String,
    pub tracks: Vec<T>,
}

impl<T: MediaTrack> MediaStream<T> {
    pub fn new(id: impl Into<String>, tracks: Vec<T>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn track_of(&self, kind: MediaKind) -> Option<&T> {
        self.tracks.iter().find(|t| t.kind() == Some(kind))
    }
}
