use crate::error::{NegotiationError, SignalingError};
use crate::media::{MediaStream, RemoteStream};
use crate::negotiation::{Negotiator, NegotiatorConfig};
use crate::peer::{PeerConnection, PeerEvent};
use crate::session::{SessionCommand, SessionUpdate, SignalingSink};
use tandem_core::{ClientMessage, IceServerConfig, ParticipantId, ServerMessage, SessionDescription};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub local: ParticipantId,
    pub remote: ParticipantId,
    pub ice_servers: Vec<IceServerConfig>,
}

impl SessionConfig {
    pub fn negotiator(&self) -> NegotiatorConfig {
        NegotiatorConfig {
            local: self.local.clone(),
            remote: self.remote.clone(),
        }
    }
}

/// Application side of a running [`Session`].
pub struct SessionHandle<T, R> {
    commands: mpsc::UnboundedSender<SessionCommand<T>>,
    pub remote_stream: watch::Receiver<RemoteStream<R>>,
    pub updates: mpsc::UnboundedReceiver<SessionUpdate>,
}

impl<T, R> SessionHandle<T, R> {
    pub fn call(&self) -> Result<(), SignalingError> {
        self.command(SessionCommand::Call)
    }

    pub fn attach_stream(&self, stream: MediaStream<T>) -> Result<(), SignalingError> {
        self.command(SessionCommand::AttachStream(stream))
    }

    pub fn close(&self) -> Result<(), SignalingError> {
        self.command(SessionCommand::Close)
    }

    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        self.updates.recv().await
    }

    fn command(&self, cmd: SessionCommand<T>) -> Result<(), SignalingError> {
        self.commands.send(cmd).map_err(|_| SignalingError::Closed)
    }
}

/// Event loop of one negotiation session.
///
/// Application commands, peer-connection callbacks and inbound signaling
/// frames are handled one at a time in arrival order. Nothing is retried: a
/// failure is reported as [`SessionUpdate::Failed`] and the session waits for
/// the next command or frame.
pub struct Session<P: PeerConnection, S> {
    negotiator: Negotiator<P>,
    remote: ParticipantId,
    sink: S,
    commands: mpsc::UnboundedReceiver<SessionCommand<P::Track>>,
    events: mpsc::UnboundedReceiver<PeerEvent<P::RemoteTrack>>,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    remote_stream: watch::Sender<RemoteStream<P::RemoteTrack>>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    established: bool,
}

impl<P, S> Session<P, S>
where
    P: PeerConnection,
    S: SignalingSink,
{
    pub fn new(
        peer: P,
        config: &SessionConfig,
        sink: S,
        events: mpsc::UnboundedReceiver<PeerEvent<P::RemoteTrack>>,
        inbound: mpsc::UnboundedReceiver<ServerMessage>,
    ) -> (Self, SessionHandle<P::Track, P::RemoteTrack>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (stream_tx, stream_rx) = watch::channel(RemoteStream::empty());

        let session = Self {
            negotiator: Negotiator::new(peer, &config.negotiator()),
            remote: config.remote.clone(),
            sink,
            commands: command_rx,
            events,
            inbound,
            remote_stream: stream_tx,
            updates: update_tx,
            established: false,
        };
        let handle = SessionHandle {
            commands: command_tx,
            remote_stream: stream_rx,
            updates: update_rx,
        };
        (session, handle)
    }

    pub fn negotiator(&self) -> &Negotiator<P> {
        &self.negotiator
    }

    pub async fn run(mut self) {
        info!(
            "Session with {} started ({:?})",
            self.remote,
            self.negotiator.role()
        );

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(SessionCommand::Call) => self.offer(false).await,
                    Some(SessionCommand::AttachStream(stream)) => self.attach(stream).await,
                    Some(SessionCommand::Close) | None => break,
                },

                Some(event) = self.events.recv() => self.handle_event(event).await,

                msg = self.inbound.recv() => match msg {
                    Some(msg) => self.handle_signal(msg).await,
                    None => {
                        info!("Signaling link closed");
                        break;
                    }
                },
            }
        }

        if let Err(e) = self.negotiator.close().await {
            warn!("Failed to close peer connection: {}", e);
        }
        let _ = self.updates.send(SessionUpdate::Closed);
        info!("Session with {} finished", self.remote);
    }

    async fn handle_event(&mut self, event: PeerEvent<P::RemoteTrack>) {
        match event {
            PeerEvent::NegotiationNeeded if self.established => self.offer(true).await,
            PeerEvent::NegotiationNeeded => {
                debug!("Negotiation needed before the call is placed, waiting");
            }
            PeerEvent::Track(track) => {
                let next = self.remote_stream.borrow().with_track(track);
                debug!("Remote stream now has {} track(s)", next.len());
                self.remote_stream.send_replace(next);
            }
            PeerEvent::LocalCandidate(candidate) => {
                let to = self.remote.to_string();
                self.signal(ClientMessage::IceCandidate { to, candidate });
            }
        }
    }

    async fn handle_signal(&mut self, msg: ServerMessage) {
        if msg.sender() != Some(&self.remote) {
            return;
        }

        match msg {
            ServerMessage::CallOffer { offer, .. } => self.answer(offer, false).await,
            ServerMessage::RenegotiateOffer { offer, .. } => self.answer(offer, true).await,
            ServerMessage::CallAnswer { answer, .. }
            | ServerMessage::RenegotiateAnswer { answer, .. } => {
                match self.negotiator.set_remote_answer(answer).await {
                    Ok(()) => self.mark_established(),
                    Err(e) => self.fail("apply answer", e),
                }
            }
            ServerMessage::IceCandidate { candidate, .. } => {
                if let Err(e) = self.negotiator.add_ice_candidate(candidate).await {
                    self.fail("add candidate", e);
                }
            }
            _ => {}
        }
    }

    async fn offer(&mut self, renegotiate: bool) {
        match self.negotiator.create_offer().await {
            Ok(offer) => {
                let to = self.remote.to_string();
                let msg = if renegotiate {
                    ClientMessage::RenegotiateOffer { to, offer }
                } else {
                    ClientMessage::CallOffer { to, offer }
                };
                self.signal(msg);
            }
            Err(NegotiationError::OfferSuperseded) => {
                debug!("Offer to {} superseded by theirs", self.remote);
            }
            Err(NegotiationError::InvalidState { state, .. }) if renegotiate => {
                debug!("Renegotiation deferred, state is {}", state);
            }
            Err(e) => self.fail("create offer", e),
        }
    }

    async fn answer(&mut self, offer: SessionDescription, renegotiate: bool) {
        match self.negotiator.create_answer(offer).await {
            Ok(answer) => {
                let to = self.remote.to_string();
                let msg = if renegotiate {
                    ClientMessage::RenegotiateAnswer { to, answer }
                } else {
                    ClientMessage::CallAnswer { to, answer }
                };
                self.signal(msg);
                self.mark_established();
            }
            Err(NegotiationError::OfferIgnored) => {
                debug!("Colliding offer from {} ignored", self.remote);
            }
            Err(e) => self.fail("answer offer", e),
        }
    }

    async fn attach(&mut self, stream: MediaStream<P::Track>) {
        match self.negotiator.attach_stream(&stream).await {
            Ok(changed) => debug!("Attached stream {} ({} sender(s) changed)", stream.id, changed),
            Err(e) => self.fail("attach stream", e),
        }
    }

    fn signal(&self, msg: ClientMessage) {
        debug!("Sending {} to {}", msg.kind(), self.remote);
        if let Err(e) = self.sink.send(msg) {
            warn!("Signaling send failed: {}", e);
        }
    }

    fn mark_established(&mut self) {
        if !self.established {
            self.established = true;
            info!("Session with {} established", self.remote);
            let _ = self.updates.send(SessionUpdate::Established);
        }
    }

    fn fail(&self, operation: &str, error: NegotiationError) {
        warn!("Failed to {}: {}", operation, error);
        let _ = self
            .updates
            .send(SessionUpdate::Failed(format!("{operation}: {error}")));
    }
}
