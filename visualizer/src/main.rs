use clap::Parser;
use iced::{
    time,
    widget::{button, column, container, row, scrollable, text, text_input, Canvas, Column, Container},
    Alignment, Color, Element, Length, Subscription, Task, Theme,
};
use log::debug;
use radarcore::bus::ConnectionState;
use radarcore::scan::{RenderModel, ScanController, ScanState};
use radarcore::telemetry::MetricsSnapshot;
use scope::RadarScope;
use serde::Deserialize;
use settings::ViewerSettings;
use std::path::PathBuf;
use std::time::Duration;
use stream::StreamEvent;
use tokio::sync::watch;

mod scope;
mod settings;
mod stream;

#[derive(Parser)]
#[command(author, version, about = "Live radar plot for the sweep sensor")]
struct Args {
    /// Load viewer settings from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// `host:port` of the ingest service
    #[arg(long)]
    server: Option<String>,
    #[arg(long)]
    max_distance: Option<f64>,
}

impl Args {
    fn settings(&self) -> anyhow::Result<ViewerSettings> {
        let mut settings = match &self.config {
            Some(path) => ViewerSettings::load(path)?,
            None => ViewerSettings::default(),
        };
        if let Some(server) = &self.server {
            settings.server = server.clone();
        }
        if let Some(max_distance) = self.max_distance {
            settings.radar.max_distance = max_distance;
        }
        settings.radar.validate()?;
        Ok(settings)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let settings = Args::parse().settings()?;

    iced::application(
        move || Visualizer::boot(settings.clone()),
        Visualizer::update,
        Visualizer::view,
    )
    .title(application_title)
    .subscription(application_subscription)
    .theme(application_theme)
    .run()?;
    Ok(())
}

fn application_title(_: &Visualizer) -> String {
    "Sweep Radar".into()
}

fn application_subscription(state: &Visualizer) -> Subscription<Message> {
    Subscription::batch([
        Subscription::run_with(state.settings.events_url(), stream::connect).map(Message::Stream),
        time::every(Duration::from_secs(3)).map(|_| Message::Tick),
        time::every(Duration::from_millis(60)).map(|_| Message::Pulse),
    ])
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Dark
}

struct Visualizer {
    settings: ViewerSettings,
    controller: ScanController,
    updates: watch::Receiver<RenderModel>,
    model: RenderModel,
    manual_input: String,
    status: String,
    server: Option<ServerStatus>,
    pulse: f32,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Stream(StreamEvent),
    ToggleScan,
    Reset,
    ManualInputChanged(String),
    SubmitManual,
    Tick,
    StatusFetched(Result<ServerStatus, String>),
    Pulse,
}

impl Visualizer {
    fn new(settings: ViewerSettings) -> Self {
        let controller = ScanController::new(settings.radar.clone());
        let updates = controller.subscribe();
        let model = controller.read_model();
        Self {
            settings,
            controller,
            updates,
            model,
            manual_input: String::new(),
            status: "Waiting for radar server...".into(),
            server: None,
            pulse: 0.0,
            history: Vec::new(),
        }
    }

    fn boot(settings: ViewerSettings) -> (Self, Task<Message>) {
        let state = Self::new(settings);
        let url = state.settings.status_url();
        (state, Task::perform(fetch_status(url), Message::StatusFetched))
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        let task = match message {
            Message::Stream(StreamEvent::Connected) => {
                state.controller.on_connect();
                state.push_history(format!("Connected to {}", state.settings.server));
                Task::none()
            }
            Message::Stream(StreamEvent::Disconnected(reason)) => {
                state.push_history(format!("Disconnected: {reason}"));
                state.controller.on_disconnect(reason);
                Task::none()
            }
            Message::Stream(StreamEvent::Failed(detail)) => {
                state.controller.on_error(detail);
                Task::none()
            }
            Message::Stream(StreamEvent::Event(event)) => {
                state.controller.handle_event(event);
                Task::none()
            }
            Message::ToggleScan => {
                let scan = state.controller.toggle_scan();
                state.push_history(match scan {
                    ScanState::Scanning => "Scan started".into(),
                    ScanState::Idle => "Scan stopped".into(),
                });
                Task::none()
            }
            Message::Reset => {
                state.controller.reset();
                state.status = "Detections cleared".into();
                state.push_history("Detections cleared".into());
                Task::none()
            }
            Message::ManualInputChanged(value) => {
                state.manual_input = value;
                Task::none()
            }
            Message::SubmitManual => {
                match state.controller.submit_manual(&state.manual_input) {
                    Ok(Some(sample)) => {
                        state.status = format!("Manual entry {:.1}°, {:.1} cm", sample.angle, sample.distance);
                        state.push_history(state.status.clone());
                        state.manual_input.clear();
                    }
                    Ok(None) => {
                        state.status = "Start scanning to record manual entries".into();
                    }
                    Err(err) => {
                        state.status = format!("Invalid entry (use angle,distance): {err}");
                    }
                }
                Task::none()
            }
            Message::Tick => Task::perform(
                fetch_status(state.settings.status_url()),
                Message::StatusFetched,
            ),
            Message::StatusFetched(Ok(server)) => {
                state.server = Some(server);
                Task::none()
            }
            Message::StatusFetched(Err(err)) => {
                debug!("status probe failed: {err}");
                state.server = None;
                Task::none()
            }
            Message::Pulse => {
                if state.model.has_contact() {
                    state.pulse = (state.pulse + 0.06) % 1.0;
                }
                Task::none()
            }
        };
        state.refresh();
        task
    }

    /// Pulls the latest read model pushed by the controller.
    fn refresh(&mut self) {
        if self.updates.has_changed().unwrap_or(false) {
            self.model = self.updates.borrow_and_update().clone();
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let model = &state.model;
        let max_distance = model.max_distance;

        let (connection_label, connection_color) = match model.connection_status {
            ConnectionState::Connected => ("Connected", Color::from_rgb(0.13, 0.77, 0.37)),
            ConnectionState::Disconnected => ("Disconnected", Color::from_rgb(0.94, 0.27, 0.27)),
            ConnectionState::Error => ("Connection error", Color::from_rgb(0.94, 0.27, 0.27)),
        };
        let connection_line = row![
            text("Status: ").size(18),
            text(connection_label).size(18).color(connection_color),
        ];

        let scan_label = match model.scan_state {
            ScanState::Scanning => "STOP SCAN",
            ScanState::Idle => "START SCAN",
        };

        let controls = column![
            text("CONTROLS").size(16),
            button(scan_label)
                .on_press(Message::ToggleScan)
                .padding(10)
                .width(Length::Fill),
            button("CLEAR")
                .on_press(Message::Reset)
                .padding(10)
                .width(Length::Fill),
            text_input("angle,distance", &state.manual_input)
                .on_input(Message::ManualInputChanged)
                .on_submit(Message::SubmitManual)
                .padding(6),
            button("ADD DETECTION")
                .on_press(Message::SubmitManual)
                .padding(10)
                .width(Length::Fill),
            text(&state.status).size(14),
        ]
        .spacing(10);

        let current = match &model.current_sample {
            Some(sample) => {
                let contact = model.has_contact();
                let distance = if contact {
                    format!("{:.1} cm", sample.distance)
                } else {
                    format!(">{} cm", max_distance)
                };
                column![
                    text(if contact { "OBJECT DETECTED" } else { "SENSOR ACTIVE" }).size(16),
                    text(format!("ANGLE: {:.1}°", sample.angle)).size(14),
                    text(format!("DISTANCE: {distance}")).size(14),
                    text(if contact { "CONTACT" } else { "NO CONTACT" })
                        .size(14)
                        .color(if contact {
                            Color::from_rgb(0.94, 0.27, 0.27)
                        } else {
                            Color::from_rgb(0.98, 0.8, 0.08)
                        }),
                ]
                .spacing(6)
            }
            None => column![text("No reading yet").size(14)],
        };

        let sensor_text = sensor_line(model, state.server.as_ref());
        let server_line = match &state.server {
            Some(server) => format!(
                "Viewers: {} | lines {} (substituted {}, rejected {})",
                server.connected_clients,
                server.metrics.lines,
                server.metrics.substituted,
                server.metrics.rejected
            ),
            None => "Server status unavailable".into(),
        };

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No activity yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                })
        };

        let info_column = column![
            controls,
            current,
            text(sensor_text).size(12),
            text(server_line).size(12),
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(140.0))).padding(6),
        ]
        .spacing(16)
        .padding(16)
        .width(Length::Fixed(320.0));

        let projector = *state.controller.projector();
        let scope = Canvas::new(RadarScope {
            model: model.clone(),
            projector,
            pulse: state.pulse,
        })
        .width(Length::Fixed((projector.center_x * 2.0) as f32))
        .height(Length::Fixed((projector.center_y + 50.0) as f32));

        let scope_column = column![
            text(format!("Trail: {} contact(s)", model.trail.len())).size(14),
            scope,
        ]
        .spacing(10)
        .padding(16);

        let layout = column![
            text("RADAR SYSTEM - OBJECT DETECTION").size(26),
            connection_line,
            row![info_column, scope_column]
                .spacing(20)
                .align_y(Alignment::Start),
        ]
        .spacing(12)
        .align_x(Alignment::Center)
        .padding(20);

        container(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .into()
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

/// Subset of the ingest service's health probe shown in the side panel.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerStatus {
    #[serde(default)]
    connected_clients: usize,
    #[serde(default)]
    sensor: Option<ConnectionState>,
    #[serde(default)]
    metrics: MetricsSnapshot,
}

/// Link events are not replayed to late viewers, so the polled state fills
/// in until a `serial-status` arrives on the stream.
fn sensor_line(model: &RenderModel, server: Option<&ServerStatus>) -> String {
    match (&model.sensor.status, &model.sensor.last_error) {
        (_, Some(error)) => format!("Sensor: error ({error})"),
        (Some(status), None) => format!(
            "Sensor: {:?}{}",
            status,
            model
                .sensor
                .port
                .as_ref()
                .map(|port| format!(" on {port}"))
                .unwrap_or_default()
        ),
        (None, None) => match server.and_then(|server| server.sensor) {
            Some(state) => format!("Sensor: {:?} (polled)", state),
            None => "Sensor: unknown".into(),
        },
    }
}

async fn fetch_status(url: String) -> Result<ServerStatus, String> {
    let response = reqwest::get(&url).await.map_err(|e| e.to_string())?;
    response
        .json::<ServerStatus>()
        .await
        .map_err(|e| e.to_string())
}
