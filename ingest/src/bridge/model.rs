use chrono::{DateTime, Utc};
use radarcore::bus::ConnectionState;
use radarcore::telemetry::MetricsSnapshot;
use serde::{Deserialize, Serialize};

/// Health probe body served at `/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub connected_clients: usize,
    pub sensor: ConnectionState,
    pub metrics: MetricsSnapshot,
}

/// Reply to a line posted to `/ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IngestReply {
    Ok { angle: f64, distance: f64 },
    Error { error: String },
}
