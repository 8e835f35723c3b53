use iced::futures::channel::mpsc;
use iced::futures::{SinkExt, Stream, StreamExt};
use log::{info, warn};
use radarcore::prelude::LinkError;
use radarcore::wire::BusEvent;
use std::time::Duration;
use tokio_tungstenite::connect_async;

const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Transport notifications and payloads from the viewer channel.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Connected,
    Disconnected(String),
    Failed(String),
    Event(BusEvent),
}

pub fn decode(text: &str) -> Option<StreamEvent> {
    match BusEvent::from_json(text) {
        Ok(event) => Some(StreamEvent::Event(event)),
        Err(err) => {
            warn!("ignoring undecodable frame {:?}: {}", text, err);
            None
        }
    }
}

/// Connects to the ingest service and yields events, reconnecting after a
/// short pause whenever the socket drops or cannot be opened.
pub fn connect(url: &String) -> impl Stream<Item = StreamEvent> {
    let url = url.clone();
    iced::stream::channel(100, move |mut output: mpsc::Sender<StreamEvent>| async move {
        loop {
            match connect_async(url.as_str()).await {
                Ok((mut socket, _)) => {
                    info!("connected to {}", url);
                    let _ = output.send(StreamEvent::Connected).await;

                    let reason = loop {
                        match socket.next().await {
                            Some(Ok(message)) if message.is_close() => {
                                break "closed by server".to_string()
                            }
                            Some(Ok(message)) if message.is_text() => {
                                if let Some(event) = message.to_text().ok().and_then(decode) {
                                    let _ = output.send(event).await;
                                }
                            }
                            Some(Ok(_)) => {}
                            Some(Err(err)) => break err.to_string(),
                            None => break "stream ended".to_string(),
                        }
                    };
                    let _ = output.send(StreamEvent::Disconnected(reason)).await;
                }
                Err(err) => {
                    let failure = LinkError::Connection(format!("{}: {}", url, err));
                    let _ = output.send(StreamEvent::Failed(failure.to_string())).await;
                }
            }
            tokio::time::sleep(RETRY_DELAY).await;
        }
    })
}
