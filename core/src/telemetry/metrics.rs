use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counters for the sensor-line ingestion loop.
pub struct IngestMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub lines: u64,
    pub accepted: u64,
    pub substituted: u64,
    pub rejected: u64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    /// One line published; `substituted` when a field had to be replaced.
    pub fn record_accepted(&self, substituted: bool) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.lines += 1;
            metrics.accepted += 1;
            if substituted {
                metrics.substituted += 1;
            }
        }
    }

    pub fn record_rejected(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.lines += 1;
            metrics.rejected += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for IngestMetrics {
    fn default() -> Self {
        Self::new()
    }
}
