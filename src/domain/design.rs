use serde::{Deserialize, Serialize};

/// A candidate cooling-system build for the array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolingDesign {
    pub name: String,
    /// Fraction of the array shaded by terracotta vents (0-1)
    pub terracotta_coverage: f64,
    /// Fan power for forced air circulation (kW)
    pub auxiliary_power_kw: f64,
    /// Capital cost (currency units)
    pub cost: f64,
    pub maintenance_hours_per_month: f64,
    /// Expected relative efficiency gain (fraction)
    pub expected_efficiency_gain: f64,
}

impl CoolingDesign {
    pub fn new(
        name: impl Into<String>,
        terracotta_coverage: f64,
        auxiliary_power_kw: f64,
        cost: f64,
        maintenance_hours_per_month: f64,
        expected_efficiency_gain: f64,
    ) -> Self {
        Self {
            name: name.into(),
            terracotta_coverage,
            auxiliary_power_kw,
            cost,
            maintenance_hours_per_month,
            expected_efficiency_gain,
        }
    }
}

/// Reference catalog of waterless cooling designs, cheapest first
pub fn default_catalog() -> Vec<CoolingDesign> {
    vec![
        CoolingDesign::new("Basic Terracotta Vents", 0.3, 0.0, 150_000.0, 8.0, 0.08),
        CoolingDesign::new("Enhanced Passive System", 0.6, 0.2, 320_000.0, 15.0, 0.15),
        CoolingDesign::new("Hybrid Active-Passive", 0.8, 1.0, 480_000.0, 25.0, 0.22),
    ]
}
