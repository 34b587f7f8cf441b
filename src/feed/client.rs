use super::{request_positions, FeedError, FeedResult};
use crate::config::FeedSource;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Connected,
    Message(String),
    Disconnected(String),
}

/// WebSocket ingest collaborator. Owns the reconnect policy; the pipeline
/// only ever sees `FeedEvent`s.
pub struct FeedClient {
    source: FeedSource,
}

impl FeedClient {
    pub fn new(source: FeedSource) -> Self {
        Self { source }
    }

    pub fn spawn(self, tx: mpsc::Sender<FeedEvent>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(tx).await })
    }

    pub async fn run(self, tx: mpsc::Sender<FeedEvent>) {
        loop {
            let reason = match self.session(&tx).await {
                Ok(()) => "closed by peer".to_string(),
                Err(FeedError::ChannelClosed) => {
                    log::debug!("Feed consumer dropped, stopping client for {}", self.source.name);
                    return;
                }
                Err(e) => e.to_string(),
            };

            log::warn!("Feed '{}' disconnected: {}", self.source.name, reason);
            if tx.send(FeedEvent::Disconnected(reason)).await.is_err() {
                return;
            }

            match self.source.reconnect_delay_ms {
                Some(delay) => {
                    log::info!("Reconnecting to {} in {}ms", self.source.url, delay);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                None => return,
            }
        }
    }

    async fn session(&self, tx: &mpsc::Sender<FeedEvent>) -> FeedResult<()> {
        let (stream, _response) = connect_async(self.source.url.as_str()).await?;
        log::info!("Connected to feed '{}' at {}", self.source.name, self.source.url);
        tx.send(FeedEvent::Connected).await.map_err(|_| FeedError::ChannelClosed)?;

        let (mut write, mut read) = stream.split();

        if self.source.request_on_connect {
            write.send(Message::Text(request_positions())).await?;
        }

        while let Some(frame) = read.next().await {
            let text = match frame? {
                Message::Text(text) => text,
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        log::warn!("Ignoring non-UTF-8 binary frame from feed");
                        continue;
                    }
                },
                Message::Close(frame) => {
                    log::debug!("Feed sent close frame: {:?}", frame);
                    break;
                }
                _ => continue,
            };

            tx.send(FeedEvent::Message(text)).await.map_err(|_| FeedError::ChannelClosed)?;
        }

        Ok(())
    }
}
