//! Layered configuration: `config/default.toml` → `--config` file → `STC__*` environment.
//!
//! Every section except `thresholds` falls back to built-in defaults. A missing or
//! malformed threshold table aborts startup.

use anyhow::Result;
use chrono::FixedOffset;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::Validate;

use crate::controller::ThresholdTable;
use crate::domain::{GeoPoint, SampleMetadata};
use crate::export::SiteConfig;
use crate::optimizer::Economics;
use crate::repo::RetryPolicy;
use crate::simulation::{
    CoolingParams, CoolingSimulator, CoolingStack, DailyCycleSimulator, DiurnalProfileConfig, LoadModelConfig,
    PhysicalModel, PhysicalModelConfig, SyntheticWeatherConfig,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "STC__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    Missing(PathBuf),

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[validate(nested)]
    pub thresholds: ThresholdTable,
    #[serde(default)]
    #[validate(nested)]
    pub physical: PhysicalModelConfig,
    #[serde(default)]
    #[validate(nested)]
    pub cooling: CoolingParams,
    #[serde(default)]
    #[validate(nested)]
    pub load_model: LoadModelConfig,
    #[serde(default)]
    #[validate(nested)]
    pub economics: Economics,
    #[serde(default)]
    #[validate(nested)]
    pub profile: DiurnalProfileConfig,
    #[serde(default)]
    #[validate(nested)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    #[validate(nested)]
    pub store: StoreConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            enable_cors: false,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Bearer token for the HTTP API; `None` leaves the API open
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MonitorConfig {
    pub device_id: String,
    #[validate(range(min = 1))]
    pub tick_seconds: u64,
    /// Stop after this many ticks (None = until shutdown)
    pub max_ticks: Option<u64>,
    /// Site offset from UTC used to derive the hour of day
    #[validate(range(min = -720, max = 840))]
    pub utc_offset_minutes: i32,
    pub location: Option<GeoPoint>,
    #[validate(nested)]
    pub weather: SyntheticWeatherConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device_id: "URGAM_PANEL_001".to_string(),
            tick_seconds: 60,
            max_ticks: None,
            utc_offset_minutes: 330,
            location: Some(GeoPoint {
                lat: 30.1652,
                lng: 78.8487,
            }),
            weather: SyntheticWeatherConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn metadata(&self) -> SampleMetadata {
        let meta = SampleMetadata::panel(self.device_id.as_str());
        match self.location {
            Some(point) => meta.with_location(point),
            None => meta,
        }
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .ok_or_else(|| anyhow::anyhow!("invalid UTC offset: {} minutes", self.utc_offset_minutes))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    #[validate(nested)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub connect_attempts: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/solar_thermal".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            connect_attempts: 5,
        }
    }
}

impl Config {
    /// Load defaults, then the optional override file, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Toml::file(DEFAULT_CONFIG_PATH));
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::Missing(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let cfg: Config = figment.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::from_figment(Figment::from(Toml::string(toml)))
    }

    pub fn cooling_stack(&self) -> CoolingStack {
        CoolingStack::new(self.cooling.clone())
    }

    pub fn physical_model(&self) -> PhysicalModel {
        PhysicalModel::new(self.physical.clone(), self.cooling_stack())
    }

    pub fn cooling_simulator(&self) -> CoolingSimulator {
        CoolingSimulator::new(
            self.cooling_stack(),
            self.load_model.clone(),
            self.economics.daily_productive_hours,
            self.economics.tariff_per_kwh,
        )
    }

    pub fn daily_simulator(&self) -> DailyCycleSimulator {
        DailyCycleSimulator::new(self.profile.clone(), self.cooling_simulator())
    }
}
