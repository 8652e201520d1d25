//! Linear temperature-derating of PV efficiency.

use serde::{Deserialize, Serialize};

/// `efficiency(T) = reference × (1 + coefficient × (T − T_ref))`, clamped to `[floor, ceiling]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyCurve {
    /// Efficiency at the reference temperature
    pub reference_efficiency: f64,
    /// Relative change per °C (negative for silicon)
    pub temp_coefficient_per_c: f64,
    pub reference_temp_c: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl EfficiencyCurve {
    /// Relative derating factor used for component readings: 1.0 at 25 °C, −0.4 %/°C
    pub fn relative() -> Self {
        Self {
            reference_efficiency: 1.0,
            temp_coefficient_per_c: -0.004,
            reference_temp_c: 25.0,
            floor: 0.1,
            ceiling: 1.0,
        }
    }

    /// Absolute cell efficiency of the installed array: 22 % at 25 °C, −0.35 %/°C
    pub fn array() -> Self {
        Self {
            reference_efficiency: 0.22,
            temp_coefficient_per_c: -0.0035,
            reference_temp_c: 25.0,
            floor: 0.1,
            ceiling: 1.0,
        }
    }

    pub fn at(&self, temp_c: f64) -> f64 {
        let delta = temp_c - self.reference_temp_c;
        let efficiency = self.reference_efficiency * (1.0 + self.temp_coefficient_per_c * delta);
        if efficiency.is_nan() {
            return self.floor;
        }
        efficiency.clamp(self.floor, self.ceiling)
    }
}

impl Default for EfficiencyCurve {
    fn default() -> Self {
        Self::relative()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_point() {
        assert!((EfficiencyCurve::relative().at(25.0) - 1.0).abs() < 1e-12);
        assert!((EfficiencyCurve::array().at(25.0) - 0.22).abs() < 1e-12);
    }

    #[test]
    fn test_derating_with_heat() {
        let curve = EfficiencyCurve::relative();
        // 50 °C above reference: 1 - 0.004 * 50 = 0.8
        assert!((curve.at(75.0) - 0.8).abs() < 1e-9);
        assert!(curve.at(90.0) < curve.at(60.0));
    }

    #[test]
    fn test_floor_and_ceiling() {
        let curve = EfficiencyCurve::relative();
        assert_eq!(curve.at(1000.0), 0.1);
        assert_eq!(curve.at(-40.0), 1.0);
        assert_eq!(EfficiencyCurve::array().at(400.0), 0.1);
    }
}
