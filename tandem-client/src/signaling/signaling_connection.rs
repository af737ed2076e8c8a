use crate::error::SignalingError;
use futures::{SinkExt, StreamExt};
use tandem_core::{
    ClientMessage, ConnectionHandle, IceServerConfig, Member, ParticipantId, RoomKey,
    ServerMessage,
};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Native client end of the relay's WebSocket.
///
/// The socket is pumped by a background task; outbound frames go through an
/// unbounded sender that doubles as the session's [`crate::SignalingSink`].
pub struct SignalingConnection {
    handle: ConnectionHandle,
    ice_servers: Vec<IceServerConfig>,
    outgoing: mpsc::UnboundedSender<ClientMessage>,
    incoming: mpsc::UnboundedReceiver<ServerMessage>,
    pump: JoinHandle<()>,
}

impl SignalingConnection {
    /// Connects and waits for the `welcome` and `ice-config` frames.
    pub async fn connect(url: &str) -> Result<Self, SignalingError> {
        let (mut socket, _) = connect_async(url).await?;

        let handle = match next_message(&mut socket).await? {
            ServerMessage::Welcome { handle } => handle,
            _ => return Err(SignalingError::Handshake("expected welcome")),
        };
        let ice_servers = match next_message(&mut socket).await? {
            ServerMessage::IceConfig { ice_servers } => ice_servers,
            _ => return Err(SignalingError::Handshake("expected ice-config")),
        };
        debug!("Connected to {} as {}", url, handle);

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let pump = tokio::spawn(pump(socket, out_rx, in_tx));

        Ok(Self {
            handle,
            ice_servers,
            outgoing: out_tx,
            incoming: in_rx,
            pump,
        })
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<ClientMessage> {
        self.outgoing.clone()
    }

    pub fn send(&self, msg: ClientMessage) -> Result<(), SignalingError> {
        self.outgoing.send(msg).map_err(|_| SignalingError::Closed)
    }

    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.incoming.recv().await
    }

    /// Joins `room` and returns the members already in it. Frames that arrive
    /// before the acknowledgment are dropped.
    pub async fn join(
        &mut self,
        identity: impl Into<ParticipantId>,
        room: impl Into<RoomKey>,
    ) -> Result<Vec<Member>, SignalingError> {
        self.send(ClientMessage::Join {
            identity: identity.into(),
            room: room.into(),
        })?;

        loop {
            match self.recv().await.ok_or(SignalingError::Closed)? {
                ServerMessage::Join { members, .. } => return Ok(members),
                ServerMessage::Error { reason } => {
                    warn!("Join rejected: {}", reason);
                    return Err(SignalingError::Handshake("join rejected"));
                }
                other => debug!("Skipping {:?} while joining", other),
            }
        }
    }

    /// Splits into the outbound sender and the inbound frame stream.
    pub fn split(
        self,
    ) -> (
        mpsc::UnboundedSender<ClientMessage>,
        mpsc::UnboundedReceiver<ServerMessage>,
    ) {
        (self.outgoing, self.incoming)
    }

    pub fn close(self) {
        self.pump.abort();
    }
}

async fn next_message(socket: &mut Socket) -> Result<ServerMessage, SignalingError> {
    while let Some(frame) = socket.next().await {
        match frame? {
            Message::Text(text) => return Ok(ServerMessage::decode(text.as_str())?),
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(SignalingError::Closed)
}

async fn pump(
    socket: Socket,
    mut out_rx: mpsc::UnboundedReceiver<ClientMessage>,
    in_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            msg = out_rx.recv() => {
                let Some(msg) = msg else {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                let json = match msg.encode() {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize client message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::text(json)).await {
                    warn!("Signaling socket send failed: {}", e);
                    break;
                }
            }

            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match ServerMessage::decode(text.as_str()) {
                    Ok(msg) => {
                        if in_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid server frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Signaling socket error: {}", e);
                    break;
                }
            },
        }
    }

    debug!("Signaling pump finished");
}
