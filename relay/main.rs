mod error;
mod hub;

use crate::error::App;
use crate::hub::Hub;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use flexi_logger::Logger;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "tandem-relay",
    about = "Relay Listen Together messages between tandem players.",
    version
)]
struct Args {
    #[arg(short = 'b', long = "bind", default_value = "0.0.0.0:3000")]
    bind: String,
    #[arg(short = 'l', long = "log", default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<(), App> {
    let args = Args::parse();
    Logger::try_with_env_or_str(&args.log)?
        .log_to_stderr()
        .start()?;

    let listener = TcpListener::bind(&args.bind).await?;
    info!("Listen Together relay running on {}", listener.local_addr()?);
    axum::serve(listener, router(Arc::new(Hub::new(256)))).await?;
    Ok(())
}

fn router(hub: Arc<Hub>) -> Router {
    Router::new().route("/", get(upgrade)).with_state(hub)
}

async fn upgrade(ws: WebSocketUpgrade, State(hub): State<Arc<Hub>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_peer(socket, hub))
}

async fn handle_peer(socket: WebSocket, hub: Arc<Hub>) {
    let mut peer = hub.join();
    let id = peer.id;
    info!("Peer {id} connected (total: {})", hub.peers());

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = peer.recv().await {
            if let Err(e) = sender.send(Message::Text(text)).await {
                error!("Failed to forward to peer {id}: {e}");
                break;
            }
        }
    });

    let receive_hub = Arc::clone(&hub);
    let mut receive_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    debug!("Peer {id} sent {}", message_type(&text));
                    receive_hub.publish(id, text);
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    error!("WebSocket error from peer {id}: {e}");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }

    info!("Peer {id} disconnected");
}

/// The `type` field of a frame, for logging only. Frames are relayed untouched.
fn message_type(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| value["type"].as_str().map(str::to_string))
        .unwrap_or_else(|| "an untyped frame".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    #[test]
    fn message_type_reads_the_tag() {
        assert_eq!(message_type(r#"{"type":"seek","time":3.5}"#), "seek");
        assert_eq!(message_type("[1,2]"), "an untyped frame");
        assert_eq!(message_type("nope"), "an untyped frame");
    }

    #[tokio::test]
    async fn relays_between_connected_players() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(Hub::new(16))))
                .await
                .unwrap();
        });

        let url = format!("ws://{addr}/");
        let (mut alice, _) = connect_async(&url).await.unwrap();
        let (mut bob, _) = connect_async(&url).await.unwrap();

        // Bob's subscription lands shortly after the handshake, so keep sending until it does.
        let received = timeout(Duration::from_secs(5), async {
            loop {
                alice
                    .send(WsMessage::Text(r#"{"type":"skip","index":1}"#.to_string()))
                    .await
                    .unwrap();
                if let Ok(Some(Ok(WsMessage::Text(text)))) =
                    timeout(Duration::from_millis(100), bob.next()).await
                {
                    return text;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(received, r#"{"type":"skip","index":1}"#);
    }
}
