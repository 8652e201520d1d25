//! # Waterless Cooling Model
//!
//! Estimates how far a panel is pulled back toward ambient by three mechanisms:
//!
//! - **Terracotta vents**: wind-driven convection through porous ceramic, evaporation
//!   from the pores (limited by humidity) and the thermal mass of the clay
//! - **Forced air**: fan-assisted convection, `h = 5 + 1.2 × wind` (W/m²K)
//! - **Radiative**: Stefan-Boltzmann exchange `σ ε (T_panel⁴ − T_ambient⁴)` with Kelvin temperatures
//!
//! Each contribution is non-negative and individually capped. The sum is subtracted from the
//! uncooled panel temperature and the result never drops below ambient.
//!
//! The [`CoolingSimulator`] wraps the stack with a load-linked baseline
//! (`T_ambient + load_kW × 1000 / 800`) and reports the effect on array efficiency, water use
//! and revenue for a single operating point.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::efficiency::EfficiencyCurve;
use crate::domain::types::clamp_or;
use crate::domain::CoolingBreakdown;

pub const STEFAN_BOLTZMANN: f64 = 5.67e-8; // W/m²K⁴
const KELVIN_OFFSET: f64 = 273.15;

/// Coefficients of the three cooling mechanisms
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CoolingParams {
    /// Terracotta surface emissivity
    #[validate(range(min = 0.0, max = 1.0))]
    pub emissivity: f64,
    /// Open pore fraction of the terracotta
    #[validate(range(min = 0.0, max = 1.0))]
    pub porosity: f64,
    /// Airflow amplification of the pores
    pub porosity_multiplier: f64,
    /// Convective cooling per (m/s × porosity) at the reference differential
    pub convection_wind_coeff: f64,
    /// Panel-ambient differential (°C) at which convection reaches its nominal rate
    #[validate(range(min = 0.1))]
    pub convection_reference_delta_c: f64,
    pub convection_max_c: f64,
    /// Evaporation potential at 0 % RH
    pub evaporative_potential: f64,
    /// Cooling (°C) at full evaporation potential
    pub evaporative_scale_c: f64,
    pub evaporative_max_c: f64,
    /// Cooling per °C of panel-ambient differential from clay thermal mass
    pub thermal_mass_coeff: f64,
    pub thermal_mass_max_c: f64,
    /// Forced convection coefficient at zero wind (W/m²K)
    pub air_base_coeff: f64,
    /// Added coefficient per m/s of wind (W/m²K)
    pub air_wind_coeff: f64,
    /// Converts `h × ΔT` to °C of cooling
    #[validate(range(min = 0.1))]
    pub air_divisor: f64,
    pub air_max_c: f64,
    /// Converts radiative flux (W/m²) to °C of cooling
    #[validate(range(min = 0.1))]
    pub radiative_divisor: f64,
    pub radiative_max_c: f64,
}

impl Default for CoolingParams {
    fn default() -> Self {
        Self {
            emissivity: 0.85,
            porosity: 0.25,
            porosity_multiplier: 1.5,
            convection_wind_coeff: 0.3,
            convection_reference_delta_c: 30.0,
            convection_max_c: 4.0,
            evaporative_potential: 0.8,
            evaporative_scale_c: 2.0,
            evaporative_max_c: 2.0,
            thermal_mass_coeff: 0.05,
            thermal_mass_max_c: 3.0,
            air_base_coeff: 5.0,
            air_wind_coeff: 1.2,
            air_divisor: 100.0,
            air_max_c: 8.0,
            radiative_divisor: 50.0,
            radiative_max_c: 5.0,
        }
    }
}

/// Additive, independently capped cooling contributions
#[derive(Debug, Clone)]
pub struct CoolingStack {
    params: CoolingParams,
}

impl CoolingStack {
    pub fn new(params: CoolingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CoolingParams {
        &self.params
    }

    /// Passive cooling from the terracotta vents
    pub fn terracotta(&self, panel_temp_c: f64, ambient_temp_c: f64, humidity_percent: f64, wind_speed_ms: f64) -> f64 {
        let p = &self.params;
        let delta = (panel_temp_c - ambient_temp_c).max(0.0);

        let convection = p.porosity * p.porosity_multiplier * wind_speed_ms * p.convection_wind_coeff * delta
            / p.convection_reference_delta_c;

        let dryness = ((100.0 - humidity_percent) / 100.0).max(0.0);
        let evaporation = dryness * p.evaporative_potential * p.evaporative_scale_c;

        let thermal_mass = delta * p.thermal_mass_coeff;

        cap(convection, p.convection_max_c) + cap(evaporation, p.evaporative_max_c) + cap(thermal_mass, p.thermal_mass_max_c)
    }

    /// Fan-assisted convection
    pub fn forced_air(&self, panel_temp_c: f64, ambient_temp_c: f64, wind_speed_ms: f64) -> f64 {
        let p = &self.params;
        let coefficient = p.air_base_coeff + p.air_wind_coeff * wind_speed_ms;
        let delta = panel_temp_c - ambient_temp_c;
        cap(coefficient * delta / p.air_divisor, p.air_max_c)
    }

    /// Long-wave radiation to the sky
    pub fn radiative(&self, panel_temp_c: f64, ambient_temp_c: f64) -> f64 {
        let p = &self.params;
        let panel_k = panel_temp_c + KELVIN_OFFSET;
        let ambient_k = ambient_temp_c + KELVIN_OFFSET;
        let flux = STEFAN_BOLTZMANN * p.emissivity * (panel_k.powi(4) - ambient_k.powi(4));
        cap(flux / p.radiative_divisor, p.radiative_max_c)
    }

    /// All three contributions for an uncooled panel temperature
    pub fn breakdown(&self, baseline_temp_c: f64, ambient_temp_c: f64, humidity_percent: f64, wind_speed_ms: f64) -> CoolingBreakdown {
        CoolingBreakdown {
            terracotta_c: self.terracotta(baseline_temp_c, ambient_temp_c, humidity_percent, wind_speed_ms),
            air_c: self.forced_air(baseline_temp_c, ambient_temp_c, wind_speed_ms),
            radiative_c: self.radiative(baseline_temp_c, ambient_temp_c),
        }
    }

    /// Cooled panel temperature, never below ambient
    pub fn apply(&self, baseline_temp_c: f64, ambient_temp_c: f64, humidity_percent: f64, wind_speed_ms: f64) -> (f64, CoolingBreakdown) {
        let breakdown = self.breakdown(baseline_temp_c, ambient_temp_c, humidity_percent, wind_speed_ms);
        let cooled = (baseline_temp_c - breakdown.total()).max(ambient_temp_c);
        (cooled, breakdown)
    }
}

impl Default for CoolingStack {
    fn default() -> Self {
        Self::new(CoolingParams::default())
    }
}

fn cap(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, max.max(0.0))
}

// ============================================================================
// Single operating point
// ============================================================================

/// Operating point for the load-linked cooling model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoolingConditions {
    pub ambient_temp_c: f64,
    /// Solar thermal load on the array (kW)
    pub solar_load_kw: f64,
    pub humidity_percent: f64,
    pub wind_speed_ms: f64,
}

impl Default for CoolingConditions {
    fn default() -> Self {
        Self {
            ambient_temp_c: 35.0,
            solar_load_kw: 50.0,
            humidity_percent: 65.0,
            wind_speed_ms: 5.0,
        }
    }
}

impl CoolingConditions {
    pub fn clamped(&self) -> Self {
        use crate::domain::bounds::*;
        Self {
            ambient_temp_c: clamp_or(self.ambient_temp_c, AMBIENT_MIN_C, AMBIENT_MAX_C, AMBIENT_FALLBACK_C),
            solar_load_kw: clamp_or(self.solar_load_kw, 0.0, SOLAR_LOAD_MAX_KW, 0.0),
            humidity_percent: clamp_or(self.humidity_percent, 0.0, HUMIDITY_MAX_PERCENT, 0.0),
            wind_speed_ms: clamp_or(self.wind_speed_ms, 0.0, WIND_MAX_MS, 0.0),
        }
    }
}

/// Constants of the load-linked model
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoadModelConfig {
    /// Heat dissipation of the array: load (W) / divisor = temperature rise (°C)
    #[validate(range(min = 1.0))]
    pub baseline_divisor: f64,
    /// Water a conventional wet-cooled array uses per kW of load (L)
    #[validate(range(min = 0.0))]
    pub water_l_per_kw: f64,
    pub array_efficiency: EfficiencyCurve,
}

impl Default for LoadModelConfig {
    fn default() -> Self {
        Self {
            baseline_divisor: 200.0 * 4.0,
            water_l_per_kw: 0.3,
            array_efficiency: EfficiencyCurve::array(),
        }
    }
}

/// Result document for one operating point.
///
/// Efficiencies are reported in percent and the gain in percentage points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolingResult {
    pub baseline_temp: f64,
    pub optimized_temp: f64,
    pub temp_reduction: f64,
    pub baseline_efficiency: f64,
    pub optimized_efficiency: f64,
    pub efficiency_gain: f64,
    pub water_saved: f64,
    pub terracotta_contribution: f64,
    pub air_cooling_contribution: f64,
    pub radiative_contribution: f64,
    pub power_gain_kw: f64,
    pub revenue_gain_daily: f64,
}

/// Load-linked wrapper around [`CoolingStack`]
#[derive(Debug, Clone)]
pub struct CoolingSimulator {
    stack: CoolingStack,
    config: LoadModelConfig,
    productive_hours_per_day: f64,
    tariff_per_kwh: f64,
}

impl CoolingSimulator {
    pub fn new(stack: CoolingStack, config: LoadModelConfig, productive_hours_per_day: f64, tariff_per_kwh: f64) -> Self {
        Self {
            stack,
            config,
            productive_hours_per_day,
            tariff_per_kwh,
        }
    }

    pub fn tariff_per_kwh(&self) -> f64 {
        self.tariff_per_kwh
    }

    pub fn baseline_temp(&self, conditions: &CoolingConditions) -> f64 {
        conditions.ambient_temp_c + conditions.solar_load_kw * 1000.0 / self.config.baseline_divisor
    }

    pub fn simulate(&self, conditions: &CoolingConditions) -> CoolingResult {
        let c = conditions.clamped();
        let baseline = self.baseline_temp(&c);
        let (optimized, breakdown) = self.stack.apply(baseline, c.ambient_temp_c, c.humidity_percent, c.wind_speed_ms);

        let curve = &self.config.array_efficiency;
        let baseline_efficiency = curve.at(baseline);
        let optimized_efficiency = curve.at(optimized);
        let gain = optimized_efficiency - baseline_efficiency;

        // A waterless build saves the whole nominal wet-cooling consumption
        let water_saved = c.solar_load_kw * self.config.water_l_per_kw;
        let power_gain_kw = c.solar_load_kw * gain;

        CoolingResult {
            baseline_temp: baseline,
            optimized_temp: optimized,
            temp_reduction: baseline - optimized,
            baseline_efficiency: baseline_efficiency * 100.0,
            optimized_efficiency: optimized_efficiency * 100.0,
            efficiency_gain: gain * 100.0,
            water_saved,
            terracotta_contribution: breakdown.terracotta_c,
            air_cooling_contribution: breakdown.air_c,
            radiative_contribution: breakdown.radiative_c,
            power_gain_kw,
            revenue_gain_daily: power_gain_kw * self.productive_hours_per_day * self.tariff_per_kwh,
        }
    }
}

impl Default for CoolingSimulator {
    fn default() -> Self {
        Self::new(CoolingStack::default(), LoadModelConfig::default(), 6.0, 4.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_operating_point() {
        let sim = CoolingSimulator::default();
        let result = sim.simulate(&CoolingConditions::default());

        // 35 + 50_000 / 800
        assert!((result.baseline_temp - 97.5).abs() < 1e-9);
        assert!(result.optimized_temp > 35.0);
        assert!(result.optimized_temp < 97.5);
        assert!((result.water_saved - 15.0).abs() < 1e-9);
        assert!(result.efficiency_gain > 0.0);
        assert!(result.power_gain_kw > 0.0);
    }

    #[test]
    fn test_contributions_are_capped() {
        let stack = CoolingStack::default();
        let p = stack.params().clone();
        // Very hot panel, gale-force wind, bone-dry air
        let b = stack.breakdown(160.0, 20.0, 0.0, 40.0);
        assert!(b.air_c <= p.air_max_c);
        assert!(b.radiative_c <= p.radiative_max_c);
        assert!(b.terracotta_c <= p.convection_max_c + p.evaporative_max_c + p.thermal_mass_max_c);
    }

    #[test]
    fn test_reference_breakdown_values() {
        let stack = CoolingStack::default();
        let b = stack.breakdown(97.5, 35.0, 65.0, 5.0);
        // convection 0.375 * 5 * 0.3 * 62.5 / 30, evaporation 0.35 * 0.8 * 2, thermal mass capped at 3
        let expected_terracotta = 0.375 * 5.0 * 0.3 * 62.5 / 30.0 + 0.56 + 3.0;
        assert!((b.terracotta_c - expected_terracotta).abs() < 1e-9);
        assert!((b.air_c - 6.875).abs() < 1e-9);
        assert_eq!(b.radiative_c, 5.0);
    }

    #[test]
    fn test_never_cools_below_ambient() {
        let stack = CoolingStack::default();
        // Barely warm panel: the evaporative term alone exceeds the differential
        let (cooled, breakdown) = stack.apply(30.5, 30.0, 0.0, 0.0);
        assert!(breakdown.total() > 0.5);
        assert_eq!(cooled, 30.0);
    }

    #[test]
    fn test_no_load_means_no_gain() {
        let sim = CoolingSimulator::default();
        let result = sim.simulate(&CoolingConditions {
            solar_load_kw: 0.0,
            ..Default::default()
        });
        assert_eq!(result.baseline_temp, 35.0);
        assert_eq!(result.optimized_temp, 35.0);
        assert_eq!(result.water_saved, 0.0);
        assert_eq!(result.power_gain_kw, 0.0);
    }

    #[test]
    fn test_negative_wind_is_clamped() {
        let sim = CoolingSimulator::default();
        let calm = sim.simulate(&CoolingConditions {
            wind_speed_ms: 0.0,
            ..Default::default()
        });
        let negative = sim.simulate(&CoolingConditions {
            wind_speed_ms: -4.0,
            ..Default::default()
        });
        assert_eq!(calm, negative);
    }

    #[test]
    fn test_unbounded_load_is_clamped() {
        let sim = CoolingSimulator::default();
        let r = sim.simulate(&CoolingConditions {
            solar_load_kw: f64::INFINITY,
            ..Default::default()
        });
        let max = sim.simulate(&CoolingConditions {
            solar_load_kw: crate::domain::bounds::SOLAR_LOAD_MAX_KW,
            ..Default::default()
        });
        assert!(r.baseline_temp.is_finite());
        assert!(r.temp_reduction.is_finite());
        assert_eq!(r, max);
    }

    proptest! {
        #[test]
        fn prop_operating_point_is_plausible(
            ambient in prop_oneof![-100.0f64..100.0, Just(f64::NAN)],
            load in prop_oneof![-10.0f64..2000.0, Just(f64::INFINITY), Just(f64::NAN)],
            humidity in -10.0f64..120.0,
            wind in -5.0f64..80.0,
        ) {
            let r = CoolingSimulator::default().simulate(&CoolingConditions {
                ambient_temp_c: ambient,
                solar_load_kw: load,
                humidity_percent: humidity,
                wind_speed_ms: wind,
            });
            let fields = [
                r.baseline_temp, r.optimized_temp, r.temp_reduction, r.baseline_efficiency,
                r.optimized_efficiency, r.efficiency_gain, r.water_saved, r.terracotta_contribution,
                r.air_cooling_contribution, r.radiative_contribution, r.power_gain_kw, r.revenue_gain_daily,
            ];
            prop_assert!(fields.iter().all(|v| v.is_finite()));

            let ambient_c = CoolingConditions { ambient_temp_c: ambient, ..Default::default() }
                .clamped()
                .ambient_temp_c;
            prop_assert!(r.optimized_temp >= ambient_c);
            prop_assert!(r.optimized_temp <= r.baseline_temp);
            prop_assert!(r.temp_reduction >= 0.0);
            prop_assert!(r.efficiency_gain >= 0.0);
        }
    }

    #[test]
    fn test_revenue_uses_productive_hours_and_tariff() {
        let sim = CoolingSimulator::new(CoolingStack::default(), LoadModelConfig::default(), 6.0, 4.5);
        let r = sim.simulate(&CoolingConditions::default());
        assert!((r.revenue_gain_daily - r.power_gain_kw * 27.0).abs() < 1e-9);
    }
}
