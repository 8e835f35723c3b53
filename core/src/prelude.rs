use serde::{Deserialize, Serialize};
use std::fmt;

/// How the sensor-side parser treats a field that is not a number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumericPolicy {
    /// Replace a bad angle with `0` and a bad distance with the sentinel.
    #[default]
    Substitute,
    /// Drop the line with a `ParseError::Numeric`.
    Reject,
}

/// Shared geometry and range configuration for every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RadarConfig {
    pub max_distance: f64,
    pub trail_length: usize,
    pub center_x: f64,
    pub center_y: f64,
    pub plot_radius: f64,
    pub numeric_policy: NumericPolicy,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            max_distance: 39.0,
            trail_length: 10,
            center_x: 250.0,
            center_y: 250.0,
            plot_radius: 200.0,
            numeric_policy: NumericPolicy::Substitute,
        }
    }
}

impl RadarConfig {
    /// Distance used to represent "no detectable target".
    pub fn sentinel_distance(&self) -> f64 {
        self.max_distance + 1.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_distance.is_finite() || self.max_distance <= 0.0 {
            return Err(ConfigError::MaxDistance(self.max_distance));
        }
        if !self.plot_radius.is_finite() || self.plot_radius <= 0.0 {
            return Err(ConfigError::PlotRadius(self.plot_radius));
        }
        if self.trail_length == 0 {
            return Err(ConfigError::TrailLength);
        }
        Ok(())
    }
}

/// Names the field of a sensor line that failed to parse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Angle,
    Distance,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Angle => f.write_str("angle"),
            Field::Distance => f.write_str("distance"),
        }
    }
}

/// Failure turning a line of text into a sample.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected 2 comma-separated fields, found {0}")]
    Format(usize),
    #[error("{field} is not a number: {text:?}")]
    Numeric { field: Field, text: String },
    #[error("distance cannot be negative: {0}")]
    Range(f64),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Failures of the sensor link or the viewer channel.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("sensor link failure: {0}")]
    Transport(String),
    #[error("channel failure: {0}")]
    Connection(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_distance must be a positive number, got {0}")]
    MaxDistance(f64),
    #[error("plot_radius must be a positive number, got {0}")]
    PlotRadius(f64),
    #[error("trail_length must be at least 1")]
    TrailLength,
}
