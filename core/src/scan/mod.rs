pub mod controller;
pub mod history;
pub mod projector;

pub use controller::{RenderModel, ScanController, ScanState};
pub use history::{fading, DetectionHistory};
pub use projector::{Projection, RadarProjector};
