use crate::wire::sample::Sample;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Up/down state carried by status events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Connected,
    Disconnected,
}

/// Greeting sent once to each newly connected viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionStatus {
    pub status: LinkStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// One accepted sensor line; `first` is the angle, `second` the distance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialData {
    pub first: f64,
    pub second: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialStatus {
    pub status: LinkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, rename = "baudRate", skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialError {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything that travels over the viewer channel, framed as
/// `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum BusEvent {
    ConnectionStatus(ConnectionStatus),
    SerialData(SerialData),
    SerialStatus(SerialStatus),
    SerialError(SerialError),
}

impl BusEvent {
    pub fn greeting(message: impl Into<String>) -> Self {
        BusEvent::ConnectionStatus(ConnectionStatus {
            status: LinkStatus::Connected,
            message: message.into(),
            timestamp: Utc::now(),
        })
    }

    pub fn data(sample: &Sample) -> Self {
        let timestamp = Utc
            .timestamp_millis_opt(sample.timestamp)
            .single()
            .unwrap_or_else(Utc::now);
        BusEvent::SerialData(SerialData {
            first: sample.angle,
            second: sample.distance,
            timestamp,
        })
    }

    pub fn link_opened(port: impl Into<String>, baud_rate: Option<u32>) -> Self {
        BusEvent::SerialStatus(SerialStatus {
            status: LinkStatus::Connected,
            port: Some(port.into()),
            baud_rate,
            timestamp: Utc::now(),
        })
    }

    pub fn link_closed() -> Self {
        BusEvent::SerialStatus(SerialStatus {
            status: LinkStatus::Disconnected,
            port: None,
            baud_rate: None,
            timestamp: Utc::now(),
        })
    }

    pub fn link_error(error: impl Into<String>) -> Self {
        BusEvent::SerialError(SerialError {
            error: error.into(),
            timestamp: Utc::now(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            BusEvent::ConnectionStatus(_) => "connection-status",
            BusEvent::SerialData(_) => "serial-data",
            BusEvent::SerialStatus(_) => "serial-status",
            BusEvent::SerialError(_) => "serial-error",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn serial_data_uses_wire_names() {
        let sample = Sample::new(45.0, 20.0, 1_700_000_000_000);
        let json: Value = serde_json::from_str(&BusEvent::data(&sample).to_json().unwrap()).unwrap();
        assert_eq!(json["event"], "serial-data");
        assert_eq!(json["data"]["first"], 45.0);
        assert_eq!(json["data"]["second"], 20.0);
        assert!(json["data"]["timestamp"].is_string());
    }

    #[test]
    fn serial_status_omits_absent_port() {
        let json: Value =
            serde_json::from_str(&BusEvent::link_closed().to_json().unwrap()).unwrap();
        assert_eq!(json["event"], "serial-status");
        assert_eq!(json["data"]["status"], "disconnected");
        assert!(json["data"].get("port").is_none());

        let opened: Value = serde_json::from_str(
            &BusEvent::link_opened("/dev/ttyUSB0", Some(9600))
                .to_json()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(opened["data"]["baudRate"], 9600);
    }

    #[test]
    fn greeting_parses_back() {
        let text = BusEvent::greeting("radar online").to_json().unwrap();
        let event = BusEvent::from_json(&text).unwrap();
        assert_eq!(event.name(), "connection-status");
    }
}
