use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SAMPLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an accepted sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(u64);

impl SampleId {
    pub fn next() -> Self {
        Self(NEXT_SAMPLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// One accepted angle/distance reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub angle: f64,
    pub distance: f64,
    pub id: SampleId,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Sample {
    pub fn new(angle: f64, distance: f64, timestamp: i64) -> Self {
        Self {
            angle,
            distance,
            id: SampleId::next(),
            timestamp,
        }
    }

    /// Same reading with the distance replaced, keeping identity and time.
    pub fn with_distance(&self, distance: f64) -> Self {
        Self {
            distance,
            ..self.clone()
        }
    }
}

/// Millisecond clock that never runs backwards for a single consumer.
#[derive(Debug, Clone, Default)]
pub struct SampleClock {
    last: i64,
}

impl SampleClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&mut self) -> i64 {
        self.stamp_at(Utc::now().timestamp_millis())
    }

    pub fn stamp_at(&mut self, now_millis: i64) -> i64 {
        self.last = self.last.max(now_millis);
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_ids_are_unique() {
        let a = Sample::new(10.0, 5.0, 0);
        let b = Sample::new(10.0, 5.0, 0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn with_distance_keeps_identity() {
        let sample = Sample::new(45.0, 999.0, 12);
        let clamped = sample.with_distance(40.0);
        assert_eq!(clamped.id, sample.id);
        assert_eq!(clamped.timestamp, 12);
        assert_eq!(clamped.distance, 40.0);
    }

    #[test]
    fn clock_holds_when_wall_time_steps_back() {
        let mut clock = SampleClock::new();
        assert_eq!(clock.stamp_at(1_000), 1_000);
        assert_eq!(clock.stamp_at(900), 1_000);
        assert_eq!(clock.stamp_at(1_200), 1_200);
    }
}
