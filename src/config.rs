use std::path::Path;

use config::{Config, ConfigError};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "GCS_DASHBOARD";

/// Request timeout used when the config does not set one.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the vehicle-control backend
    pub address: String,

    /// Per-request timeout, also the longest the dashboard waits for a
    /// disconnect acknowledgement
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coords {
    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    /// Where the view rests when no session is active
    pub default_center: Coords,
    pub default_zoom: u8,

    /// Zoom used when snapping to the first fix of a session
    pub fix_zoom: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    pub backend: BackendConfig,
    pub poll: PollConfig,
    pub map: MapConfig,
}

impl DashboardConfig {
    fn base() -> Result<Config, ConfigError> {
        let mut c = Config::new();

        c.set_default("backend.address", "http://127.0.0.1:5000")?;
        c.set_default("backend.timeout_ms", DEFAULT_TIMEOUT_MS as i64)?;
        c.set_default("poll.interval_ms", 1000i64)?;
        c.set_default("map.default_center.lat", 0.0)?;
        c.set_default("map.default_center.lon", 0.0)?;
        c.set_default("map.default_zoom", 2i64)?;
        c.set_default("map.fix_zoom", 16i64)?;

        Ok(c)
    }

    /// Defaults overlaid with environment variables of the form
    /// `GCS_DASHBOARD_<SECTION>__<KEY>`, e.g. `GCS_DASHBOARD_POLL__INTERVAL_MS`.
    pub fn read() -> Result<Self, ConfigError> {
        Self::layered(None, ENV_PREFIX)
    }

    /// Like [`DashboardConfig::read`], with the file layered between the
    /// defaults and the environment.
    pub fn read_from_path(path: &Path) -> Result<Self, ConfigError> {
        Self::layered(Some(path), ENV_PREFIX)
    }

    fn layered(path: Option<&Path>, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut c = Self::base()?;

        if let Some(path) = path {
            c.merge(config::File::from(path))?;
        }

        c.merge(config::Environment::with_prefix(env_prefix).separator("__"))?;

        c.try_into::<Self>()?.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::Message(
                "poll.interval_ms must be greater than zero".into(),
            ));
        }

        Ok(self)
    }
}
