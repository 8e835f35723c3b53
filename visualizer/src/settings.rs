use anyhow::Context;
use radarcore::prelude::RadarConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerSettings {
    /// `host:port` of the ingest service.
    pub server: String,
    pub radar: RadarConfig,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:4000".into(),
            radar: RadarConfig::default(),
        }
    }
}

impl ViewerSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading viewer settings {}", path_ref.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing viewer settings {}", path_ref.display()))
    }

    pub fn events_url(&self) -> String {
        format!("ws://{}/events", self.server)
    }

    pub fn status_url(&self) -> String {
        format!("http://{}/", self.server)
    }
}
