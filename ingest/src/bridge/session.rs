use crate::workflow::runner::Ingestor;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use radarcore::wire::BusEvent;
use warp::ws::{Message, WebSocket};

const GREETING: &str = "Connected to radar server";

/// One viewer connection: greet, then forward bus events until either side
/// goes away. The subscription is always returned to the bus on exit.
pub async fn serve(socket: WebSocket, ingestor: Ingestor) {
    let bus = ingestor.bus().clone();
    let mut subscription = bus.subscribe();
    let id = subscription.id();
    info!("{} connected ({} viewer(s))", id, bus.subscriber_count());

    let (mut outgoing, mut incoming) = socket.split();
    if let Err(err) = send(&mut outgoing, &BusEvent::greeting(GREETING)).await {
        debug!("{} greeting failed: {}", id, err);
        bus.unsubscribe(subscription);
        return;
    }

    let reason = loop {
        tokio::select! {
            event = subscription.recv() => match event {
                Some(event) => {
                    if let Err(err) = send(&mut outgoing, &event).await {
                        break format!("send failed: {}", err);
                    }
                }
                None => break "dropped by bus".to_string(),
            },
            message = incoming.next() => match message {
                Some(Ok(message)) if message.is_close() => break "closed by viewer".to_string(),
                Some(Ok(message)) => {
                    if let Ok(text) = message.to_str() {
                        debug!("{} says {:?}", id, text);
                    }
                }
                Some(Err(err)) => break format!("receive failed: {}", err),
                None => break "stream ended".to_string(),
            },
        }
    };

    bus.unsubscribe(subscription);
    info!("{} disconnected: {}", id, reason);
}

async fn send(sink: &mut SplitSink<WebSocket, Message>, event: &BusEvent) -> anyhow::Result<()> {
    let text = event.to_json()?;
    sink.send(Message::text(text)).await?;
    Ok(())
}
