use crate::router::RouterCommand;
use crate::signaling::SignalingService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tandem_core::ConnectionHandle;
use tracing::{debug, error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    let handle = ConnectionHandle::new();

    ws.on_upgrade(move |socket| handle_socket(socket, handle, service))
}

async fn handle_socket(socket: WebSocket, handle: ConnectionHandle, service: SignalingService) {
    info!("New WebSocket connection: {}", handle);

    let (mut sender, mut receiver) = socket.split();
    let queue = service.open(handle);
    let mut rx = queue.rx;
    let kicked = queue.kicked;

    if let Err(e) = service.submit(RouterCommand::Connect { handle }).await {
        error!("Cannot register {}: {}", handle, e);
        service.close(&handle);
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();

        async move {
            while let Some(frame) = receiver.next().await {
                let msg = match frame {
                    Ok(msg) => msg,
                    Err(e) => {
                        debug!("WebSocket error on {}: {}", handle, e);
                        break;
                    }
                };
                match msg {
                    Message::Text(text) => {
                        let cmd = RouterCommand::Inbound {
                            handle,
                            text: text.as_str().to_owned(),
                        };
                        if let Err(e) = service.submit(cmd).await {
                            error!("Router died: {}", e);
                            break;
                        }
                    }
                    Message::Binary(_) => warn!("Ignoring binary frame from {}", handle),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
        _ = kicked.notified() => {
            recv_task.abort();
            send_task.abort();
        }
    };

    service.close(&handle);
    if let Err(e) = service.submit(RouterCommand::Disconnect { handle }).await {
        warn!("Could not report disconnect of {}: {}", handle, e);
    }
    info!("WebSocket disconnected: {}", handle);
}
