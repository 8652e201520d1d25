//! Synthetic site conditions for the live monitor.
//!
//! Stands in for a sensor feed: a smooth diurnal curve plus uniform jitter drawn from a
//! seedable generator, so monitor runs are reproducible when a seed is configured.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use validator::Validate;

use crate::domain::EnvironmentSample;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SyntheticWeatherConfig {
    /// Daily mean ambient temperature (°C)
    pub base_ambient_c: f64,
    /// Half the day/night ambient swing (°C)
    pub ambient_swing_c: f64,
    /// Uniform ambient noise half-width (°C)
    #[validate(range(min = 0.0))]
    pub ambient_jitter_c: f64,
    /// Irradiance at solar noon before jitter (W/m²)
    #[validate(range(min = 0.0))]
    pub peak_irradiance_wm2: f64,
    #[validate(range(min = 0.0))]
    pub irradiance_jitter_wm2: f64,
    pub sunrise_hour: f64,
    pub sunset_hour: f64,
    #[validate(range(min = 0.0))]
    pub wind_min_ms: f64,
    #[validate(range(min = 0.0))]
    pub wind_max_ms: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub humidity_min_percent: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub humidity_max_percent: f64,
    /// Random seed for reproducibility (None = random)
    pub random_seed: Option<u64>,
}

impl Default for SyntheticWeatherConfig {
    fn default() -> Self {
        Self {
            base_ambient_c: 25.0,
            ambient_swing_c: 5.0,
            ambient_jitter_c: 3.0,
            peak_irradiance_wm2: 800.0,
            irradiance_jitter_wm2: 100.0,
            sunrise_hour: 6.0,
            sunset_hour: 18.0,
            wind_min_ms: 1.0,
            wind_max_ms: 5.0,
            humidity_min_percent: 45.0,
            humidity_max_percent: 85.0,
            random_seed: None,
        }
    }
}

/// Seedable generator of [`EnvironmentSample`]s
pub struct SyntheticWeather {
    config: SyntheticWeatherConfig,
    rng: StdRng,
}

impl SyntheticWeather {
    pub fn new(config: SyntheticWeatherConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Draw conditions for a local hour of day (0-24)
    pub fn sample_at(&mut self, hour: f64) -> EnvironmentSample {
        let c = &self.config;
        let phase = ((hour - 6.0) * PI / 12.0).sin();

        let ambient = c.base_ambient_c + c.ambient_swing_c * phase + uniform(&mut self.rng, c.ambient_jitter_c);

        let irradiance = if (c.sunrise_hour..=c.sunset_hour).contains(&hour) {
            let peak = c.peak_irradiance_wm2 + uniform(&mut self.rng, c.irradiance_jitter_wm2);
            (peak * phase).max(0.0)
        } else {
            0.0
        };

        let wind = between(&mut self.rng, c.wind_min_ms, c.wind_max_ms);
        let humidity = between(&mut self.rng, c.humidity_min_percent, c.humidity_max_percent);

        EnvironmentSample::new(ambient, irradiance, humidity, wind, hour)
    }
}

/// Uniform draw from `[-half_width, half_width]`
fn uniform(rng: &mut StdRng, half_width: f64) -> f64 {
    between(rng, -half_width, half_width)
}

fn between(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}
