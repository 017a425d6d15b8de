use crate::error::App;
use crate::sync::message::SyncMessage;
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::task;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Connects to the relay and returns the queue feeding the socket.
///
/// Parsed inbound messages go to `inbound`. There is no reconnect: once the
/// socket drops, queued messages are discarded.
pub async fn connect(
    url: &str,
    inbound: mpsc::Sender<SyncMessage>,
) -> Result<mpsc::UnboundedSender<SyncMessage>, App> {
    let (stream, _) = connect_async(url).await?;
    info!("Connected to Listen Together relay at {url}");

    let (mut sink, mut source) = stream.split();
    let (outbound, mut outbound_receiver) = mpsc::unbounded_channel::<SyncMessage>();

    task::spawn(async move {
        while let Some(message) = outbound_receiver.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode {message:?}: {e}");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text)).await {
                error!("Failed to send to relay: {e}");
                break;
            }
        }
    });

    task::spawn(async move {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(Message::Text(text)) => match SyncMessage::from_json(&text) {
                    Ok(message) => {
                        if inbound.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping malformed sync frame {text:?}: {e}"),
                },
                Ok(Message::Close(_)) => {
                    info!("Relay closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Relay socket error: {e}");
                    break;
                }
            }
        }
    });

    Ok(outbound)
}
