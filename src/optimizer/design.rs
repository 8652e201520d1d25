//! # Cooling Design Selection
//!
//! Each catalog entry is valued as
//!
//! annual_revenue = gain × capacity_kW × days × productive_hours × tariff
//! roi_5_year     = (annual_revenue × 5 − cost) / cost
//! payback_years  = cost / annual_revenue
//!
//! Entries passing [`Constraints`] are ranked by ROI, highest first. The sort is stable so
//! equal ROI keeps catalog order; undefined ROI ranks last.

use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use tracing::{debug, info};

use super::{Constraints, DesignEvaluation, Economics, OptimizationReport};
use crate::domain::CoolingDesign;

pub const ROI_HORIZON_YEARS: f64 = 5.0;

#[derive(Debug, Clone, Default)]
pub struct DesignOptimizer {
    economics: Economics,
}

impl DesignOptimizer {
    pub fn new(economics: Economics) -> Self {
        Self { economics }
    }

    pub fn economics(&self) -> &Economics {
        &self.economics
    }

    pub fn annual_revenue_gain(&self, design: &CoolingDesign) -> f64 {
        let e = &self.economics;
        design.expected_efficiency_gain
            * e.installed_capacity_kw
            * e.operating_days_per_year
            * e.daily_productive_hours
            * e.tariff_per_kwh
    }

    pub fn evaluate(&self, design: &CoolingDesign, constraints: &Constraints) -> DesignEvaluation {
        let annual = self.annual_revenue_gain(design);
        let cost = design.cost;

        let roi = (cost > 0.0).then(|| (annual * ROI_HORIZON_YEARS - cost) / cost);
        let payback = (annual > 0.0).then(|| cost.max(0.0) / annual);

        DesignEvaluation {
            design: design.clone(),
            meets_constraints: constraints.admits(design),
            annual_revenue_gain: annual,
            roi_5_year: roi.filter(|v| v.is_finite()),
            payback_years: payback.filter(|v| v.is_finite()),
        }
    }

    pub fn optimize(&self, catalog: &[CoolingDesign], constraints: &Constraints) -> OptimizationReport {
        let all_designs: Vec<DesignEvaluation> = catalog.iter().map(|d| self.evaluate(d, constraints)).collect();

        let mut viable: Vec<&DesignEvaluation> = all_designs.iter().filter(|e| e.meets_constraints).collect();
        viable.sort_by_key(|e| Reverse(e.roi_5_year.map(OrderedFloat)));

        for (rank, e) in viable.iter().enumerate() {
            debug!(rank = rank + 1, design = %e.design.name, roi = ?e.roi_5_year, "Viable design");
        }

        let recommended = viable.first().map(|e| (*e).clone());
        match &recommended {
            Some(best) => info!(
                design = %best.design.name,
                roi_5_year = ?best.roi_5_year,
                payback_years = ?best.payback_years,
                viable = viable.len(),
                "Recommended cooling design"
            ),
            None => info!(candidates = all_designs.len(), "No cooling design satisfies the constraints"),
        }

        OptimizationReport {
            all_designs,
            recommended,
            constraints: constraints.clone(),
        }
    }
}
