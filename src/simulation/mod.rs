//! # Thermal Simulation Module
//!
//! Physical models of a solar installation under waterless cooling.
//!
//! ## Components
//!
//! - **Physical**: Environment sample → panel/inverter/battery temperatures and relative efficiency
//! - **Cooling**: Terracotta, forced-air and radiative cooling contributions; load-linked single operating point
//! - **Daily**: Synthetic diurnal profile swept through the cooling model, folded into a daily summary
//! - **Weather**: Seedable synthetic site conditions for the live monitor
//!
//! ## Usage
//!
//! ```rust
//! use solar_thermal_controller::domain::EnvironmentSample;
//! use solar_thermal_controller::simulation::PhysicalModel;
//!
//! let model = PhysicalModel::default();
//! let reading = model.evaluate(&EnvironmentSample::new(32.0, 850.0, 55.0, 3.0, 13.0));
//!
//! assert!(reading.panel_temp_c >= 32.0);
//! assert!((0.1..=1.0).contains(&reading.efficiency));
//! ```

pub mod cooling;
pub mod daily;
pub mod efficiency;
pub mod physical;
pub mod weather;

pub use cooling::{
    CoolingConditions, CoolingParams, CoolingResult, CoolingSimulator, CoolingStack, LoadModelConfig,
};
pub use daily::{
    DailyCycleReport, DailyCycleSimulator, DailySummary, DiurnalProfile, DiurnalProfileConfig, HourlyResult,
    ProfileStep,
};
pub use efficiency::EfficiencyCurve;
pub use physical::{PhysicalModel, PhysicalModelConfig};
pub use weather::{SyntheticWeather, SyntheticWeatherConfig};
