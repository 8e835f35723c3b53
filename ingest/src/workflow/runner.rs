use crate::workflow::config::LinkSource;
use log::{debug, error, info, warn};
use radarcore::bus::{ConnectionMonitor, ConnectionState, SampleBus};
use radarcore::prelude::{LinkError, ParseResult, RadarConfig};
use radarcore::telemetry::{IngestMetrics, MetricsSnapshot};
use radarcore::wire::{BusEvent, Sample, SampleClock, SampleParser};
use std::sync::{Arc, Mutex};

/// Producer side of the pipeline: parses sensor lines in arrival order and
/// publishes them, and reports sensor-link transitions to viewers.
#[derive(Clone)]
pub struct Ingestor {
    parser: SampleParser,
    bus: SampleBus<BusEvent>,
    metrics: Arc<IngestMetrics>,
    link: Arc<Mutex<ConnectionMonitor>>,
    clock: Arc<Mutex<SampleClock>>,
}

impl Ingestor {
    pub fn new(radar: &RadarConfig, bus: SampleBus<BusEvent>) -> Self {
        Self {
            parser: SampleParser::from_config(radar),
            bus,
            metrics: Arc::new(IngestMetrics::new()),
            link: Arc::new(Mutex::new(ConnectionMonitor::new())),
            clock: Arc::new(Mutex::new(SampleClock::new())),
        }
    }

    pub fn bus(&self) -> &SampleBus<BusEvent> {
        &self.bus
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn link_state(&self) -> ConnectionState {
        self.link
            .lock()
            .map(|monitor| monitor.state())
            .unwrap_or(ConnectionState::Error)
    }

    fn stamp(&self) -> i64 {
        match self.clock.lock() {
            Ok(mut clock) => clock.stamp(),
            Err(poisoned) => poisoned.into_inner().stamp(),
        }
    }

    /// Parses one line and publishes it. A bad line is logged and counted;
    /// it never stops the caller from feeding the next one.
    pub fn ingest_line(&self, line: &str) -> ParseResult<Sample> {
        match self.parser.parse_sensor(line, self.stamp()) {
            Ok(recovered) => {
                for issue in &recovered.issues {
                    warn!("line {:?}: {}, substituted", line, issue);
                }
                self.metrics.record_accepted(!recovered.is_clean());
                let viewers = self.bus.publish(BusEvent::data(&recovered.sample));
                debug!(
                    "published ({}, {}) to {} viewer(s)",
                    recovered.sample.angle, recovered.sample.distance, viewers
                );
                Ok(recovered.sample)
            }
            Err(err) => {
                warn!("line {:?} dropped: {}", line, err);
                self.metrics.record_rejected();
                Err(err)
            }
        }
    }

    pub fn link_opened(&self, source: &LinkSource) {
        if let Ok(mut link) = self.link.lock() {
            link.on_connect();
        }
        info!("sensor link {} open", source.label());
        self.bus
            .publish(BusEvent::link_opened(source.label(), source.baud_rate()));
    }

    pub fn link_closed(&self, reason: &str) {
        if let Ok(mut link) = self.link.lock() {
            link.on_disconnect(reason);
        }
        info!("sensor link closed: {}", reason);
        self.bus.publish(BusEvent::link_closed());
    }

    pub fn link_failed(&self, err: &LinkError) {
        if let Ok(mut link) = self.link.lock() {
            link.on_link_error(err);
        }
        error!("{}", err);
        self.bus.publish(BusEvent::link_error(err.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radarcore::prelude::ParseError;

    fn ingestor() -> (Ingestor, radarcore::bus::Subscription<BusEvent>) {
        let bus = SampleBus::new();
        let subscription = bus.subscribe();
        (Ingestor::new(&RadarConfig::default(), bus), subscription)
    }

    #[test]
    fn good_line_is_published_as_serial_data() {
        let (ingestor, mut sub) = ingestor();
        ingestor.ingest_line("45,20").unwrap();
        match sub.try_recv() {
            Some(BusEvent::SerialData(data)) => {
                assert_eq!((data.first, data.second), (45.0, 20.0));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(ingestor.metrics().accepted, 1);
    }

    #[test]
    fn bad_line_does_not_stop_the_next_one() {
        let (ingestor, mut sub) = ingestor();
        assert_eq!(ingestor.ingest_line("garbage"), Err(ParseError::Format(1)));
        ingestor.ingest_line("x,12").unwrap();
        ingestor.ingest_line("30,10").unwrap();

        let seen: Vec<BusEvent> = std::iter::from_fn(|| sub.try_recv()).collect();
        assert_eq!(seen.len(), 2);
        let metrics = ingestor.metrics();
        assert_eq!(metrics.lines, 3);
        assert_eq!(metrics.rejected, 1);
        assert_eq!(metrics.substituted, 1);
    }

    #[test]
    fn link_transitions_are_broadcast() {
        let (ingestor, mut sub) = ingestor();
        ingestor.link_opened(&LinkSource::Stdin);
        assert_eq!(ingestor.link_state(), ConnectionState::Connected);
        ingestor.link_failed(&LinkError::Transport("read timed out".into()));
        assert_eq!(ingestor.link_state(), ConnectionState::Error);
        ingestor.link_closed("read failure");
        assert_eq!(ingestor.link_state(), ConnectionState::Disconnected);

        let names: Vec<&str> = std::iter::from_fn(|| sub.try_recv())
            .map(|event| event.name())
            .collect();
        assert_eq!(names, vec!["serial-status", "serial-error", "serial-status"]);
    }
}
