use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::CoolingDesign;

/// Limits a cooling design must satisfy to be recommended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Constraints {
    #[validate(range(min = 0.0))]
    pub max_budget: f64,
    #[validate(range(min = 0.0))]
    pub max_maintenance_hours: f64,
    /// Minimum expected efficiency gain (fraction)
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_efficiency_gain: f64,
    /// Share of conventional cooling water the build should save (fraction); reported, not filtered on
    #[validate(range(min = 0.0, max = 1.0))]
    pub water_savings_target: f64,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_budget: 500_000.0,
            max_maintenance_hours: 20.0,
            min_efficiency_gain: 0.05,
            water_savings_target: 0.8,
        }
    }
}

impl Constraints {
    pub fn admits(&self, design: &CoolingDesign) -> bool {
        design.cost <= self.max_budget
            && design.maintenance_hours_per_month <= self.max_maintenance_hours
            && design.expected_efficiency_gain >= self.min_efficiency_gain
    }
}
