use crate::prelude::RadarConfig;
use crate::scan::controller::ScanState;
use crate::scan::projector::RadarProjector;
use crate::wire::sample::Sample;
use std::collections::VecDeque;

/// Bounded trail of recent contacts plus the latest reading.
#[derive(Debug, Clone)]
pub struct DetectionHistory {
    trail: VecDeque<Sample>,
    current: Option<Sample>,
    capacity: usize,
    max_distance: f64,
}

impl DetectionHistory {
    pub fn new(capacity: usize, max_distance: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            trail: VecDeque::with_capacity(capacity + 1),
            current: None,
            capacity,
            max_distance,
        }
    }

    pub fn from_config(config: &RadarConfig) -> Self {
        Self::new(config.trail_length, config.max_distance)
    }

    /// Records `sample` while scanning; ignored otherwise. In-range samples
    /// join the trail (oldest evicted past capacity); anything else only
    /// becomes the current sample, with its distance pinned to the sentinel.
    /// Returns whether the history changed.
    pub fn append(&mut self, sample: Sample, scan: ScanState) -> bool {
        if scan != ScanState::Scanning {
            return false;
        }

        if RadarProjector::is_in_range(sample.distance, self.max_distance) {
            self.current = Some(sample.clone());
            self.trail.push_back(sample);
            while self.trail.len() > self.capacity {
                self.trail.pop_front();
            }
        } else {
            self.current = Some(sample.with_distance(self.max_distance + 1.0));
        }
        true
    }

    pub fn clear(&mut self) {
        self.trail.clear();
        self.current = None;
    }

    pub fn current(&self) -> Option<&Sample> {
        self.current.as_ref()
    }

    pub fn trail(&self) -> impl Iterator<Item = &Sample> {
        self.trail.iter()
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.trail.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.trail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }
}

/// Older trail entries with their fill opacity, newest excluded since it is
/// drawn as the current contact.
pub fn fading(trail: &[Sample]) -> Vec<(&Sample, f32)> {
    let len = trail.len();
    trail
        .iter()
        .take(len.saturating_sub(1))
        .enumerate()
        .map(|(index, sample)| (sample, 0.1 + (index as f32 / len as f32) * 0.4))
        .collect()
}
