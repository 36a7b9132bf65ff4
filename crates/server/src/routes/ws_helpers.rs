use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt, stream::BoxStream};
use serde::Serialize;

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Sends every item of `stream` as a JSON text frame until the stream ends or
/// the client goes away. Idle connections get a ping every 30 seconds.
pub async fn forward_json_to_ws<T>(
    socket: WebSocket,
    mut stream: BoxStream<'static, Result<T, std::io::Error>>,
) -> anyhow::Result<()>
where
    T: Serialize + Send + 'static,
{
    let (mut sender, mut receiver) = socket.split();
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.tick().await;

    let result = loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(item)) => {
                    let text = serde_json::to_string(&item)?;
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break Ok(());
                    }
                }
                Some(Err(e)) => break Err(anyhow::anyhow!("notification stream failed: {}", e)),
                None => break Ok(()),
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break Ok(()),
                Some(Ok(_)) => {}
            },
            _ = ping.tick() => {
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break Ok(());
                }
            }
        }
    };

    let _ = sender.close().await;
    result
}
