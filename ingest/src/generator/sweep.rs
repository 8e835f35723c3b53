use crate::generator::pattern::PingPong;
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};

/// Configuration for the synthetic range sensor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub step_degrees: u32,
    pub interval_ms: u64,
    pub seed: u64,
    pub contact_probability: f64,
    pub min_contact: f64,
    pub max_contact: f64,
    pub far_distance: f64,
    /// Emit a garbled line every N lines.
    pub glitch_every: Option<u64>,
    /// Stop after this many lines; runs forever when unset.
    pub limit: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            step_degrees: 2,
            interval_ms: 30,
            seed: 0,
            contact_probability: 0.25,
            min_contact: 4.0,
            max_contact: 36.0,
            far_distance: 250.0,
            glitch_every: None,
            limit: None,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.contact_probability),
            "contact_probability must be within 0..=1, got {}",
            self.contact_probability
        );
        for (name, value) in [
            ("min_contact", self.min_contact),
            ("max_contact", self.max_contact),
            ("far_distance", self.far_distance),
        ] {
            anyhow::ensure!(value.is_finite(), "{} must be finite, got {}", name, value);
        }
        Ok(())
    }

    fn normalized_contact(&self) -> (f64, f64) {
        let low = self.min_contact.max(1.0);
        let high = self.max_contact.max(low + 1.0);
        (low, high)
    }
}

/// Produces `"<angle>,<distance>\r\n"` lines the way the sensor firmware does.
pub struct SweepGenerator {
    config: GeneratorConfig,
    rng: StdRng,
    angles: PingPong,
    emitted: u64,
}

impl SweepGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            angles: PingPong::new(config.step_degrees),
            config,
            emitted: 0,
        }
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn is_exhausted(&self) -> bool {
        self.config
            .limit
            .map(|limit| self.emitted >= limit)
            .unwrap_or(false)
    }

    pub fn next_line(&mut self) -> String {
        self.emitted += 1;
        let angle = self.angles.next().unwrap_or(0);

        if let Some(every) = self.config.glitch_every.filter(|every| *every > 0) {
            if self.emitted % every == 0 {
                return glitch(angle, self.emitted / every);
            }
        }

        let distance = if self.rng.gen_bool(self.config.contact_probability.clamp(0.0, 1.0)) {
            let (low, high) = self.config.normalized_contact();
            self.rng.gen_range(low..high)
        } else {
            let (_, high) = self.config.normalized_contact();
            self.rng
                .gen_range(high..self.config.far_distance.max(high + 1.0))
        };
        format!("{},{}\r\n", angle, distance.round() as i64)
    }
}

fn glitch(angle: u32, nth: u64) -> String {
    match nth % 3 {
        0 => format!("{},ERR\r\n", angle),
        1 => format!("{}\r\n", angle),
        _ => format!("?{},,\r\n", angle),
    }
}

/// Runs a generator on its own task, writing into an in-memory pipe whose
/// read half behaves like a serial device.
pub fn spawn(config: GeneratorConfig) -> DuplexStream {
    let (mut writer, reader) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        let period = Duration::from_millis(config.interval_ms.max(1));
        let mut generator = SweepGenerator::new(config);
        let mut ticker = tokio::time::interval(period);
        while !generator.is_exhausted() {
            ticker.tick().await;
            let line = generator.next_line();
            if writer.write_all(line.as_bytes()).await.is_err() {
                debug!("synthetic sensor reader went away");
                break;
            }
        }
        debug!("synthetic sensor stopped after {} lines", generator.emitted());
    });
    reader
}
