use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tandem_core::{ClientMessage, ServerMessage, SessionDescription};
use tandem_server::{RelayConfig, serve_on};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::integration::init_tracing;
use crate::utils::TEST_SDP;

const SIGNAL_TIMEOUT: Duration = Duration::from_secs(5);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> Result<(SocketAddr, oneshot::Sender<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown = async {
            let _ = stop_rx.await;
        };
        if let Err(e) = serve_on(listener, RelayConfig::default(), shutdown).await {
            tracing::error!("test server failed: {}", e);
        }
    });

    Ok((addr, stop_tx))
}

async fn open(addr: SocketAddr) -> Result<Socket> {
    let (socket, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .context("WebSocket handshake failed")?;
    Ok(socket)
}

async fn send(socket: &mut Socket, msg: &ClientMessage) -> Result<()> {
    socket.send(Message::text(msg.encode()?)).await?;
    Ok(())
}

async fn next_message(socket: &mut Socket) -> Result<ServerMessage> {
    loop {
        let frame = timeout(SIGNAL_TIMEOUT, socket.next())
            .await
            .context("Timeout waiting for server frame")?;
        match frame {
            Some(Ok(Message::Text(text))) => return Ok(ServerMessage::decode(text.as_str())?),
            Some(Ok(Message::Close(_))) | None => bail!("server closed the socket"),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

#[tokio::test]
async fn test_offer_travels_between_two_websockets() -> Result<()> {
    init_tracing();
    let (addr, stop) = start_server().await?;

    let mut alice = open(addr).await?;
    let ServerMessage::Welcome { handle: alice_handle } = next_message(&mut alice).await? else {
        bail!("expected welcome first");
    };
    assert!(matches!(
        next_message(&mut alice).await?,
        ServerMessage::IceConfig { .. }
    ));
    send(
        &mut alice,
        &ClientMessage::Join {
            identity: "alice@example.com".into(),
            room: "room1".into(),
        },
    )
    .await?;
    assert!(matches!(
        next_message(&mut alice).await?,
        ServerMessage::Join { .. }
    ));

    let mut bob = open(addr).await?;
    next_message(&mut bob).await?;
    next_message(&mut bob).await?;
    send(
        &mut bob,
        &ClientMessage::Join {
            identity: "bob@example.com".into(),
            room: "room1".into(),
        },
    )
    .await?;
    let ServerMessage::Join { members, .. } = next_message(&mut bob).await? else {
        bail!("expected join ack");
    };
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].handle, alice_handle);

    assert!(matches!(
        next_message(&mut alice).await?,
        ServerMessage::UserJoined { .. }
    ));

    send(
        &mut bob,
        &ClientMessage::CallOffer {
            to: "alice@example.com".into(),
            offer: SessionDescription::offer(TEST_SDP),
        },
    )
    .await?;
    assert_eq!(
        next_message(&mut alice).await?,
        ServerMessage::CallOffer {
            from: "bob@example.com".into(),
            offer: SessionDescription::offer(TEST_SDP),
        }
    );

    bob.close(None).await?;
    assert!(matches!(
        next_message(&mut alice).await?,
        ServerMessage::UserLeft { .. }
    ));

    let _ = stop.send(());
    Ok(())
}

#[tokio::test]
async fn test_health_route_answers_ok() -> Result<()> {
    init_tracing();
    let (addr, stop) = start_server().await?;

    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await?;
    let mut response = String::new();
    timeout(SIGNAL_TIMEOUT, stream.read_to_string(&mut response))
        .await
        .context("Timeout waiting for health response")??;

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("ok"));

    let _ = stop.send(());
    Ok(())
}
