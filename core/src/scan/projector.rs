use crate::prelude::RadarConfig;
use serde::{Deserialize, Serialize};

/// Plot position of a reading and whether it counts as a contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub x: f64,
    pub y: f64,
    pub in_range: bool,
}

impl Projection {
    pub fn point(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// Maps `(angle, distance)` on the 0..180 degree sweep onto plot coordinates.
///
/// 0 degrees lies at the left end of the baseline, 90 straight up, 180 at the
/// right end. Screen `y` grows downward, so "up" is `center_y - radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarProjector {
    pub center_x: f64,
    pub center_y: f64,
    pub plot_radius: f64,
}

impl RadarProjector {
    pub fn new(center_x: f64, center_y: f64, plot_radius: f64) -> Self {
        Self {
            center_x,
            center_y,
            plot_radius,
        }
    }

    pub fn from_config(config: &RadarConfig) -> Self {
        Self::new(config.center_x, config.center_y, config.plot_radius)
    }

    pub fn is_in_range(distance: f64, max_distance: f64) -> bool {
        distance > 0.0 && distance <= max_distance
    }

    pub fn project(&self, angle: f64, distance: f64, max_distance: f64) -> Projection {
        let in_range = Self::is_in_range(distance, max_distance);
        // A non-positive distance reads as one unit past the maximum range
        // instead of collapsing onto the centre.
        let effective = if distance <= 0.0 {
            max_distance + 1.0
        } else {
            distance
        };
        let radius = effective.min(max_distance) / max_distance * self.plot_radius;
        let (x, y) = self.polar(angle, radius);
        Projection { x, y, in_range }
    }

    /// Point at full plot radius along `angle`, used for the bearing line.
    pub fn rim(&self, angle: f64) -> (f64, f64) {
        self.polar(angle, self.plot_radius)
    }

    /// Radii of `count` evenly spaced range rings, innermost first.
    pub fn ring_radii(&self, count: usize) -> Vec<f64> {
        (1..=count)
            .map(|ring| self.plot_radius * ring as f64 / count as f64)
            .collect()
    }

    /// Rim points of radial guide lines every `step_degrees` across the sweep.
    pub fn radial_lines(&self, step_degrees: u32) -> Vec<(u32, (f64, f64))> {
        (0..=180)
            .step_by(step_degrees.max(1) as usize)
            .map(|angle| (angle, self.rim(angle as f64)))
            .collect()
    }

    fn polar(&self, angle: f64, radius: f64) -> (f64, f64) {
        let angle_rad = (angle - 90.0).to_radians();
        (
            self.center_x + radius * angle_rad.sin(),
            self.center_y - radius * angle_rad.cos(),
        )
    }
}

impl Default for RadarProjector {
    fn default() -> Self {
        Self::from_config(&RadarConfig::default())
    }
}
