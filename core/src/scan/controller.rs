use crate::bus::connection::{ConnectionMonitor, ConnectionState};
use crate::prelude::{LinkError, ParseResult, RadarConfig};
use crate::scan::history::DetectionHistory;
use crate::scan::projector::{Projection, RadarProjector};
use crate::wire::event::{BusEvent, LinkStatus};
use crate::wire::parser::SampleParser;
use crate::wire::sample::{Sample, SampleClock};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    #[default]
    Idle,
    Scanning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SensorLinkView {
    pub status: Option<LinkStatus>,
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub last_error: Option<String>,
}

/// Read model handed to the rendering layer after every accepted event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderModel {
    pub connection_status: ConnectionState,
    pub connection_detail: Option<String>,
    pub sensor: SensorLinkView,
    pub scan_state: ScanState,
    pub current_sample: Option<Sample>,
    pub current_projection: Option<Projection>,
    pub trail: Vec<Sample>,
    pub max_distance: f64,
}

impl RenderModel {
    pub fn has_contact(&self) -> bool {
        self.current_projection
            .map(|projection| projection.in_range)
            .unwrap_or(false)
    }
}

/// Owns scan state, history and connection state for one viewer, and pushes
/// a fresh [`RenderModel`] through a watch channel after each change.
pub struct ScanController {
    config: RadarConfig,
    scan: ScanState,
    history: DetectionHistory,
    connection: ConnectionMonitor,
    sensor: SensorLinkView,
    projector: RadarProjector,
    parser: SampleParser,
    clock: SampleClock,
    updates: watch::Sender<RenderModel>,
}

impl ScanController {
    pub fn new(config: RadarConfig) -> Self {
        let history = DetectionHistory::from_config(&config);
        let projector = RadarProjector::from_config(&config);
        let parser = SampleParser::from_config(&config);
        let initial = RenderModel {
            connection_status: ConnectionState::Disconnected,
            connection_detail: None,
            sensor: SensorLinkView::default(),
            scan_state: ScanState::Idle,
            current_sample: None,
            current_projection: None,
            trail: Vec::new(),
            max_distance: config.max_distance,
        };
        let (updates, _) = watch::channel(initial);
        Self {
            config,
            scan: ScanState::Idle,
            history,
            connection: ConnectionMonitor::new(),
            sensor: SensorLinkView::default(),
            projector,
            parser,
            clock: SampleClock::new(),
            updates,
        }
    }

    pub fn config(&self) -> &RadarConfig {
        &self.config
    }

    pub fn projector(&self) -> &RadarProjector {
        &self.projector
    }

    pub fn scan_state(&self) -> ScanState {
        self.scan
    }

    pub fn history(&self) -> &DetectionHistory {
        &self.history
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Flips between idle and scanning. The trail survives a stop/start
    /// cycle; only [`reset`](Self::reset) clears it.
    pub fn toggle_scan(&mut self) -> ScanState {
        self.scan = match self.scan {
            ScanState::Idle => ScanState::Scanning,
            ScanState::Scanning => ScanState::Idle,
        };
        info!("scan {:?}", self.scan);
        self.notify();
        self.scan
    }

    /// Validates an `"angle,distance"` entry. Errors leave all state as is.
    /// Returns the recorded sample, or `None` when the scan is idle.
    pub fn submit_manual(&mut self, text: &str) -> ParseResult<Option<Sample>> {
        let sample = self
            .parser
            .parse_manual(text, self.clock.stamp())
            .inspect_err(|err| warn!("manual entry {:?} rejected: {}", text, err))?;
        Ok(self.record(sample))
    }

    pub fn reset(&mut self) {
        self.history.clear();
        debug!("history cleared");
        self.notify();
    }

    pub fn on_connect(&mut self) {
        if self.connection.on_connect() {
            self.notify();
        }
    }

    pub fn on_disconnect(&mut self, reason: impl Into<String>) {
        if self.connection.on_disconnect(reason) {
            self.notify();
        }
    }

    pub fn on_error(&mut self, detail: impl Into<String>) {
        if self.connection.on_error(detail) {
            self.notify();
        }
    }

    pub fn on_link_error(&mut self, error: &LinkError) {
        if self.connection.on_link_error(error) {
            self.notify();
        }
    }

    pub fn handle_event(&mut self, event: BusEvent) {
        match event {
            BusEvent::ConnectionStatus(greeting) => {
                debug!("server says: {}", greeting.message);
                self.on_connect();
            }
            BusEvent::SerialData(data) => {
                self.accept_reading(data.first, data.second);
            }
            BusEvent::SerialStatus(status) => {
                self.sensor.status = Some(status.status);
                if status.status == LinkStatus::Connected {
                    self.sensor.port = status.port;
                    self.sensor.baud_rate = status.baud_rate;
                    self.sensor.last_error = None;
                }
                self.notify();
            }
            BusEvent::SerialError(error) => {
                warn!("sensor link error: {}", error.error);
                self.sensor.last_error = Some(error.error);
                self.notify();
            }
        }
    }

    /// Stamps a delivered reading on this consumer's clock.
    pub fn accept_reading(&mut self, angle: f64, distance: f64) -> Option<Sample> {
        if !angle.is_finite() || !distance.is_finite() {
            warn!("dropping non-finite reading ({}, {})", angle, distance);
            return None;
        }
        let sample = Sample::new(angle, distance, self.clock.stamp());
        self.record(sample)
    }

    fn record(&mut self, sample: Sample) -> Option<Sample> {
        if !self.history.append(sample, self.scan) {
            return None;
        }
        self.notify();
        self.history.current().cloned()
    }

    pub fn read_model(&self) -> RenderModel {
        let current_sample = self.history.current().cloned();
        let current_projection = current_sample.as_ref().map(|sample| {
            self.projector
                .project(sample.angle, sample.distance, self.config.max_distance)
        });
        RenderModel {
            connection_status: self.connection.state(),
            connection_detail: self.connection.last_reason().map(str::to_string),
            sensor: self.sensor.clone(),
            scan_state: self.scan,
            current_sample,
            current_projection,
            trail: self.history.to_vec(),
            max_distance: self.config.max_distance,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderModel> {
        self.updates.subscribe()
    }

    fn notify(&self) {
        self.updates.send_replace(self.read_model());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::ParseError;

    fn controller() -> ScanController {
        ScanController::new(RadarConfig::default())
    }

    #[test]
    fn toggle_flips_scan_state() {
        let mut controller = controller();
        assert_eq!(controller.toggle_scan(), ScanState::Scanning);
        assert_eq!(controller.toggle_scan(), ScanState::Idle);
    }

    #[test]
    fn idle_controller_ignores_readings_but_tracks_connection() {
        let mut controller = controller();
        controller.on_connect();
        assert!(controller.accept_reading(45.0, 20.0).is_none());
        let model = controller.read_model();
        assert_eq!(model.connection_status, ConnectionState::Connected);
        assert!(model.current_sample.is_none());
        assert!(model.trail.is_empty());
    }

    #[test]
    fn manual_entry_errors_leave_state_untouched() {
        let mut controller = controller();
        controller.toggle_scan();
        controller.submit_manual("10,10").unwrap();
        let before = controller.read_model();

        assert_eq!(controller.submit_manual("10"), Err(ParseError::Format(1)));
        assert!(matches!(
            controller.submit_manual("ten,10"),
            Err(ParseError::Numeric { .. })
        ));
        assert_eq!(controller.submit_manual("10,-2"), Err(ParseError::Range(-2.0)));
        assert_eq!(controller.read_model(), before);
    }

    #[test]
    fn manual_entry_past_range_reads_as_no_contact() {
        let mut controller = controller();
        controller.toggle_scan();
        let sample = controller.submit_manual("120, 75").unwrap().unwrap();
        assert_eq!(sample.distance, 40.0);
        let model = controller.read_model();
        assert!(!model.has_contact());
        assert!(model.trail.is_empty());
    }

    #[test]
    fn manual_entry_while_idle_is_validated_but_not_recorded() {
        let mut controller = controller();
        assert_eq!(controller.submit_manual("10,10"), Ok(None));
        assert!(controller.submit_manual("10,-1").is_err());
        assert!(controller.read_model().current_sample.is_none());
    }

    #[test]
    fn restart_preserves_trail_and_reset_clears_it() {
        let mut controller = controller();
        controller.toggle_scan();
        controller.accept_reading(30.0, 12.0);
        controller.toggle_scan();
        controller.toggle_scan();
        assert_eq!(controller.read_model().trail.len(), 1);

        controller.reset();
        let model = controller.read_model();
        assert!(model.trail.is_empty());
        assert!(model.current_sample.is_none());
    }

    #[test]
    fn timestamps_never_decrease() {
        let mut controller = controller();
        controller.toggle_scan();
        let stamps: Vec<i64> = (0..20)
            .filter_map(|i| controller.accept_reading(i as f64, 10.0))
            .map(|sample| sample.timestamp)
            .collect();
        assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn sensor_events_update_link_view() {
        let mut controller = controller();
        controller.handle_event(BusEvent::link_opened("/dev/ttyACM0", Some(9600)));
        assert_eq!(
            controller.read_model().sensor.status,
            Some(LinkStatus::Connected)
        );
        controller.handle_event(BusEvent::link_error("device unplugged"));
        controller.handle_event(BusEvent::link_closed());
        let sensor = controller.read_model().sensor;
        assert_eq!(sensor.status, Some(LinkStatus::Disconnected));
        assert_eq!(sensor.last_error.as_deref(), Some("device unplugged"));
        assert_eq!(controller.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn watchers_see_each_change() {
        let mut controller = controller();
        let mut updates = controller.subscribe();
        controller.toggle_scan();
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().scan_state, ScanState::Scanning);
        controller.accept_reading(45.0, 20.0);
        assert!(updates.has_changed().unwrap());
        assert!(updates.borrow_and_update().has_contact());
    }
}
