use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ============================================================================
// Devices
// ============================================================================

/// Monitored component class of a solar installation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceType {
    Panel,
    Inverter,
    Battery,
}

/// Identifier of a physical device (e.g. `URGAM_PANEL_001`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Physical bounds applied to environment inputs before modeling.
///
/// Out-of-range values are pulled to the nearest bound instead of being rejected,
/// so every sample produces a plausible estimate.
pub mod bounds {
    pub const AMBIENT_MIN_C: f64 = -60.0;
    pub const AMBIENT_MAX_C: f64 = 70.0;
    pub const IRRADIANCE_MAX_WM2: f64 = 1500.0;
    pub const HUMIDITY_MAX_PERCENT: f64 = 100.0;
    pub const WIND_MAX_MS: f64 = 60.0;
    /// Thermal load of one array block (kW)
    pub const SOLAR_LOAD_MAX_KW: f64 = 1000.0;
    pub const HOURS_PER_DAY: f64 = 24.0;
    /// Ambient used when a sensor delivers NaN
    pub const AMBIENT_FALLBACK_C: f64 = 25.0;
}

/// Clamp to `[lo, hi]`, mapping NaN to `fallback`
pub(crate) fn clamp_or(value: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(lo, hi)
    }
}

/// One observation of site conditions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSample {
    /// Ambient air temperature (°C)
    pub ambient_temp_c: f64,
    /// Plane-of-array irradiance (W/m²)
    pub solar_irradiance_wm2: f64,
    /// Relative humidity (%)
    pub humidity_percent: f64,
    /// Wind speed (m/s)
    pub wind_speed_ms: f64,
    /// Local hour of day (0-24)
    pub time_of_day_h: f64,
}

impl EnvironmentSample {
    pub fn new(
        ambient_temp_c: f64,
        solar_irradiance_wm2: f64,
        humidity_percent: f64,
        wind_speed_ms: f64,
        time_of_day_h: f64,
    ) -> Self {
        Self {
            ambient_temp_c,
            solar_irradiance_wm2,
            humidity_percent,
            wind_speed_ms,
            time_of_day_h,
        }
    }

    /// Copy of this sample with every field pulled into its physical range
    pub fn clamped(&self) -> Self {
        use bounds::*;
        Self {
            ambient_temp_c: clamp_or(self.ambient_temp_c, AMBIENT_MIN_C, AMBIENT_MAX_C, AMBIENT_FALLBACK_C),
            solar_irradiance_wm2: clamp_or(self.solar_irradiance_wm2, 0.0, IRRADIANCE_MAX_WM2, 0.0),
            humidity_percent: clamp_or(self.humidity_percent, 0.0, HUMIDITY_MAX_PERCENT, 0.0),
            wind_speed_ms: clamp_or(self.wind_speed_ms, 0.0, WIND_MAX_MS, 0.0),
            time_of_day_h: clamp_or(self.time_of_day_h, 0.0, HOURS_PER_DAY, 0.0),
        }
    }
}

/// Temperature reduction attributed to each cooling mechanism (°C)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoolingBreakdown {
    /// Porous terracotta vents: convection + evaporation + thermal mass
    pub terracotta_c: f64,
    /// Forced air circulation
    pub air_c: f64,
    /// Long-wave radiation to the sky
    pub radiative_c: f64,
}

impl CoolingBreakdown {
    pub fn total(&self) -> f64 {
        self.terracotta_c + self.air_c + self.radiative_c
    }
}

/// Component temperatures derived from one environment sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalReading {
    /// Sample the reading was derived from (already clamped)
    pub sample: EnvironmentSample,
    /// Panel temperature without any cooling (°C)
    pub baseline_panel_temp_c: f64,
    /// Panel temperature after cooling (°C)
    pub panel_temp_c: f64,
    pub inverter_temp_c: f64,
    pub battery_temp_c: f64,
    /// Relative panel efficiency (0.1-1.0)
    pub efficiency: f64,
    pub cooling: CoolingBreakdown,
    pub captured_at: DateTime<Utc>,
}

impl ThermalReading {
    pub fn temperature_of(&self, device: DeviceType) -> f64 {
        match device {
            DeviceType::Panel => self.panel_temp_c,
            DeviceType::Inverter => self.inverter_temp_c,
            DeviceType::Battery => self.battery_temp_c,
        }
    }
}

// ============================================================================
// Alerts
// ============================================================================

/// Alert severity; declaration order is the escalation order
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
    Emergency,
}

/// What kind of condition raised the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertCategory {
    Temperature,
    Efficiency,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub device_type: DeviceType,
    pub category: AlertCategory,
    pub severity: Severity,
    pub message: String,
    /// Observed value that breached the limit
    pub value: f64,
    pub limit: f64,
    /// Set only by the operator resolution workflow
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(
        device_type: DeviceType,
        category: AlertCategory,
        severity: Severity,
        value: f64,
        limit: f64,
        message: String,
    ) -> Self {
        Self {
            device_type,
            category,
            severity,
            message,
            value,
            limit,
            resolved: false,
            resolved_at: None,
        }
    }
}

// ============================================================================
// Persistence records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Context stored alongside a reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub device_id: DeviceId,
    pub device_type: DeviceType,
    pub location: Option<GeoPoint>,
}

impl SampleMetadata {
    pub fn panel(device_id: impl Into<DeviceId>) -> Self {
        Self {
            device_id: device_id.into(),
            device_type: DeviceType::Panel,
            location: None,
        }
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub metadata: SampleMetadata,
    pub reading: ThermalReading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: i64,
    pub raised_at: DateTime<Utc>,
    pub device_id: DeviceId,
    pub alert: Alert,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_clamp_negative_irradiance_and_wind() {
        let s = EnvironmentSample::new(30.0, -200.0, 140.0, -3.0, 12.0).clamped();
        assert_eq!(s.solar_irradiance_wm2, 0.0);
        assert_eq!(s.humidity_percent, 100.0);
        assert_eq!(s.wind_speed_ms, 0.0);
        assert_eq!(s.ambient_temp_c, 30.0);
    }

    #[test]
    fn test_clamp_extreme_and_nan_values() {
        let s = EnvironmentSample::new(f64::NAN, 5000.0, 50.0, 250.0, 30.0).clamped();
        assert_eq!(s.ambient_temp_c, bounds::AMBIENT_FALLBACK_C);
        assert_eq!(s.solar_irradiance_wm2, bounds::IRRADIANCE_MAX_WM2);
        assert_eq!(s.wind_speed_ms, bounds::WIND_MAX_MS);
        assert_eq!(s.time_of_day_h, 24.0);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Warning < Severity::Critical);
        assert!(Severity::Critical < Severity::Emergency);
    }

    #[test]
    fn test_enum_string_round_trip() {
        assert_eq!(DeviceType::Inverter.to_string(), "inverter");
        assert_eq!(Severity::from_str("critical").unwrap(), Severity::Critical);
        assert_eq!(AlertCategory::from_str("efficiency").unwrap(), AlertCategory::Efficiency);
        assert!(DeviceType::from_str("pannel").is_err());
    }

    #[test]
    fn test_device_type_serializes_snake_case() {
        let json = serde_json::to_string(&DeviceType::Battery).unwrap();
        assert_eq!(json, "\"battery\"");
    }
}
