use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Constraints;
use crate::domain::CoolingDesign;

/// Revenue assumptions used to value an efficiency gain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Economics {
    #[validate(range(min = 0.0))]
    pub installed_capacity_kw: f64,
    #[validate(range(min = 0.0, max = 366.0))]
    pub operating_days_per_year: f64,
    #[validate(range(min = 0.0, max = 24.0))]
    pub daily_productive_hours: f64,
    /// Currency units per kWh
    #[validate(range(min = 0.0))]
    pub tariff_per_kwh: f64,
}

impl Default for Economics {
    fn default() -> Self {
        Self {
            installed_capacity_kw: 100.0,
            operating_days_per_year: 300.0,
            daily_productive_hours: 6.0,
            tariff_per_kwh: 4.5,
        }
    }
}

/// A catalog entry with its constraint flag and economics.
///
/// `roi_5_year` and `payback_years` are `None` when undefined (zero cost or no revenue).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignEvaluation {
    #[serde(flatten)]
    pub design: CoolingDesign,
    pub meets_constraints: bool,
    pub annual_revenue_gain: f64,
    pub roi_5_year: Option<f64>,
    pub payback_years: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Every catalog entry in catalog order
    pub all_designs: Vec<DesignEvaluation>,
    pub recommended: Option<DesignEvaluation>,
    pub constraints: Constraints,
}
