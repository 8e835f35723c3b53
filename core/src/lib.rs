//! Realtime sample pipeline for a rotating range sensor.
//!
//! Sensor lines are parsed into samples, fanned out over the sample bus,
//! and folded by each viewer into a bounded detection history that the
//! projector maps onto a semicircular radar plot.

pub mod bus;
pub mod prelude;
pub mod scan;
pub mod telemetry;
pub mod wire;

pub use prelude::{NumericPolicy, ParseError, RadarConfig};
pub use scan::{RenderModel, ScanController, ScanState};
pub use wire::{BusEvent, Sample};
