use crate::bridge::model::{IngestReply, StatusReport};
use crate::bridge::session;
use crate::workflow::runner::Ingestor;
use chrono::Utc;
use std::convert::Infallible;
use warp::{
    http::StatusCode,
    hyper::body::Bytes,
    reply::{Json, WithStatus},
    Filter,
};

fn with_ingestor(
    ingestor: Ingestor,
) -> impl Filter<Extract = (Ingestor,), Error = Infallible> + Clone {
    warp::any().map(move || ingestor.clone())
}

/// HTTP surface of the ingest service:
/// `GET /` health probe, `GET /events` viewer WebSocket, `POST /ingest` test line.
pub fn routes(
    ingestor: Ingestor,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let status_route = warp::path::end()
        .and(warp::get())
        .and(with_ingestor(ingestor.clone()))
        .map(|ingestor: Ingestor| warp::reply::json(&status_report(&ingestor)));

    let events_route = warp::path("events")
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_ingestor(ingestor.clone()))
        .map(|ws: warp::ws::Ws, ingestor: Ingestor| {
            ws.on_upgrade(move |socket| session::serve(socket, ingestor))
        });

    let ingest_route = warp::path("ingest")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(256))
        .and(warp::body::bytes())
        .and(with_ingestor(ingestor))
        .map(|body: Bytes, ingestor: Ingestor| ingest_reply(&body, &ingestor));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    status_route
        .or(events_route)
        .or(ingest_route)
        .with(cors)
        .with(warp::log("ingest::http"))
}

fn status_report(ingestor: &Ingestor) -> StatusReport {
    StatusReport {
        message: "Radar ingest server running".into(),
        timestamp: Utc::now(),
        connected_clients: ingestor.bus().subscriber_count(),
        sensor: ingestor.link_state(),
        metrics: ingestor.metrics(),
    }
}

fn ingest_reply(body: &[u8], ingestor: &Ingestor) -> WithStatus<Json> {
    let text = String::from_utf8_lossy(body);
    match ingestor.ingest_line(text.trim()) {
        Ok(sample) => warp::reply::with_status(
            warp::reply::json(&IngestReply::Ok {
                angle: sample.angle,
                distance: sample.distance,
            }),
            StatusCode::OK,
        ),
        Err(err) => warp::reply::with_status(
            warp::reply::json(&IngestReply::Error {
                error: err.to_string(),
            }),
            StatusCode::BAD_REQUEST,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radarcore::bus::SampleBus;
    use radarcore::prelude::RadarConfig;
    use radarcore::wire::BusEvent;
    use serde_json::Value;
    use std::time::Duration;

    fn ingestor() -> Ingestor {
        Ingestor::new(&RadarConfig::default(), SampleBus::new())
    }

    #[tokio::test]
    async fn status_probe_reports_viewers_and_metrics() {
        let ingestor = ingestor();
        let _viewer = ingestor.bus().subscribe();
        ingestor.ingest_line("10,10").unwrap();

        let response = warp::test::request()
            .method("GET")
            .path("/")
            .reply(&routes(ingestor))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["connectedClients"], 1);
        assert_eq!(body["sensor"], "disconnected");
        assert_eq!(body["metrics"]["accepted"], 1);
    }

    #[tokio::test]
    async fn posted_line_is_ingested_or_rejected() {
        let filter = routes(ingestor());

        let accepted = warp::test::request()
            .method("POST")
            .path("/ingest")
            .body("45,20")
            .reply(&filter)
            .await;
        assert_eq!(accepted.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(accepted.body()).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["distance"], 20.0);

        let rejected = warp::test::request()
            .method("POST")
            .path("/ingest")
            .body("45")
            .reply(&filter)
            .await;
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(rejected.body()).unwrap();
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn viewer_socket_is_greeted_then_streamed() {
        let ingestor = ingestor();
        let mut client = warp::test::ws()
            .path("/events")
            .handshake(routes(ingestor.clone()))
            .await
            .expect("handshake");

        let greeting = client.recv().await.unwrap();
        let event = BusEvent::from_json(greeting.to_str().unwrap()).unwrap();
        assert_eq!(event.name(), "connection-status");
        assert_eq!(ingestor.bus().subscriber_count(), 1);

        ingestor.ingest_line("45,20").unwrap();
        let data = client.recv().await.unwrap();
        match BusEvent::from_json(data.to_str().unwrap()).unwrap() {
            BusEvent::SerialData(data) => assert_eq!((data.first, data.second), (45.0, 20.0)),
            other => panic!("unexpected event {:?}", other),
        }

        drop(client);
        for _ in 0..100 {
            if ingestor.bus().subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(ingestor.bus().subscriber_count(), 0);
    }
}
