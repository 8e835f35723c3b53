use crate::generator::sweep::GeneratorConfig;
use anyhow::Context;
use radarcore::prelude::RadarConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where sensor lines come from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LinkSource {
    /// Character device (serial adapter). Line settings are expected to be
    /// configured on the device beforehand; `baud_rate` is reported to viewers.
    Device {
        path: PathBuf,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
    /// Raw TCP stream, e.g. a serial-to-network bridge.
    Tcp { address: String },
    Stdin,
    Synthetic(GeneratorConfig),
}

fn default_baud_rate() -> u32 {
    9600
}

impl LinkSource {
    pub fn label(&self) -> String {
        match self {
            LinkSource::Device { path, .. } => path.display().to_string(),
            LinkSource::Tcp { address } => format!("tcp://{}", address),
            LinkSource::Stdin => "stdin".into(),
            LinkSource::Synthetic(config) => format!("synthetic(seed={})", config.seed),
        }
    }

    pub fn baud_rate(&self) -> Option<u32> {
        match self {
            LinkSource::Device { baud_rate, .. } => Some(*baud_rate),
            _ => None,
        }
    }
}

impl Default for LinkSource {
    fn default() -> Self {
        LinkSource::Device {
            path: PathBuf::from("/dev/ttyUSB0"),
            baud_rate: default_baud_rate(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub listen: SocketAddr,
    pub source: LinkSource,
    pub reconnect_secs: Option<u64>,
    pub subscriber_capacity: usize,
    pub radar: RadarConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 4000)),
            source: LinkSource::default(),
            reconnect_secs: None,
            subscriber_capacity: radarcore::bus::hub::DEFAULT_CAPACITY,
            radar: RadarConfig::default(),
        }
    }
}

impl IngestConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading ingest config {}", path_ref.display()))?;
        let config: IngestConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing ingest config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.radar.validate().context("invalid radar section")?;
        anyhow::ensure!(
            self.subscriber_capacity > 0,
            "subscriber_capacity must be at least 1"
        );
        if let LinkSource::Synthetic(generator) = &self.source {
            generator.validate().context("invalid synthetic source")?;
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Option<Duration> {
        self.reconnect_secs.map(Duration::from_secs)
    }
}
