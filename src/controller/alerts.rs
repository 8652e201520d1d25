//! # Thermal Alert Evaluation
//!
//! Pure threshold checks over a [`ThermalReading`]. Rules are evaluated independently and
//! every applicable alert is returned, ordered panel → inverter → efficiency:
//!
//! | Condition                                    | Device   | Severity |
//! |----------------------------------------------|----------|----------|
//! | panel > panel max                            | panel    | critical |
//! | panel max − margin < panel ≤ panel max       | panel    | warning  |
//! | inverter > inverter max                      | inverter | critical |
//! | efficiency < advisory                        | panel    | warning  |
//!
//! The battery record is carried for the zone export and is not checked here.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::{Alert, AlertCategory, DeviceType, Severity, ThermalReading};

/// Operating limits of one device class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct DeviceThreshold {
    #[validate(range(min = -50.0, max = 150.0))]
    pub max_temp_c: f64,
    #[validate(range(min = -50.0, max = 150.0))]
    pub min_temp_c: f64,
}

impl DeviceThreshold {
    pub const fn new(max_temp_c: f64, min_temp_c: f64) -> Self {
        Self { max_temp_c, min_temp_c }
    }
}

/// Device type → threshold record, plus alerting margins.
///
/// No `Default`; thresholds come from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_table"))]
pub struct ThresholdTable {
    #[validate(nested)]
    pub panel: DeviceThreshold,
    #[validate(nested)]
    pub inverter: DeviceThreshold,
    #[validate(nested)]
    pub battery: DeviceThreshold,
    /// Width of the panel warning band below the maximum (°C)
    #[validate(range(min = 0.0, max = 50.0))]
    pub warning_margin_c: f64,
    /// Relative efficiency below which an advisory is raised
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub efficiency_advisory: f64,
    /// Site ambient operating range (°C)
    pub ambient_min_c: f64,
    pub ambient_max_c: f64,
}

fn validate_table(table: &ThresholdTable) -> Result<(), ValidationError> {
    for device in [DeviceType::Panel, DeviceType::Inverter, DeviceType::Battery] {
        let t = table.for_device(device);
        if !(t.min_temp_c < t.max_temp_c) {
            let mut err = ValidationError::new("min_not_below_max");
            err.add_param("device".into(), &device.as_ref());
            return Err(err);
        }
    }
    if !(table.ambient_min_c < table.ambient_max_c) {
        return Err(ValidationError::new("ambient_range_inverted"));
    }
    Ok(())
}

impl ThresholdTable {
    pub fn for_device(&self, device: DeviceType) -> &DeviceThreshold {
        match device {
            DeviceType::Panel => &self.panel,
            DeviceType::Inverter => &self.inverter,
            DeviceType::Battery => &self.battery,
        }
    }

    /// Values of the reference installation; configuration must still supply them explicitly
    pub fn reference() -> Self {
        Self {
            panel: DeviceThreshold::new(65.0, 25.0),
            inverter: DeviceThreshold::new(40.0, 20.0),
            battery: DeviceThreshold::new(35.0, 15.0),
            warning_margin_c: 5.0,
            efficiency_advisory: 0.80,
            ambient_min_c: -10.0,
            ambient_max_c: 50.0,
        }
    }
}

/// Stateless rule engine over a [`ThresholdTable`]
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    thresholds: ThresholdTable,
}

impl AlertEvaluator {
    pub fn new(thresholds: ThresholdTable) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn evaluate(&self, reading: &ThermalReading) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if let Some(alert) = self.panel_alert(reading.panel_temp_c) {
            alerts.push(alert);
        }

        let inverter_max = self.thresholds.inverter.max_temp_c;
        if reading.inverter_temp_c > inverter_max {
            alerts.push(Alert::new(
                DeviceType::Inverter,
                AlertCategory::Temperature,
                Severity::Critical,
                reading.inverter_temp_c,
                inverter_max,
                format!(
                    "Inverter temperature {:.1}°C exceeds safe operating limit {:.1}°C",
                    reading.inverter_temp_c, inverter_max
                ),
            ));
        }

        let advisory = self.thresholds.efficiency_advisory;
        if reading.efficiency < advisory {
            alerts.push(Alert::new(
                DeviceType::Panel,
                AlertCategory::Efficiency,
                Severity::Warning,
                reading.efficiency,
                advisory,
                format!(
                    "Panel efficiency reduced to {:.1}% (advisory below {:.1}%) due to high temperature",
                    reading.efficiency * 100.0,
                    advisory * 100.0
                ),
            ));
        }

        alerts
    }

    /// Severity of the panel temperature rule alone
    pub fn panel_severity(&self, panel_temp_c: f64) -> Option<Severity> {
        let max = self.thresholds.panel.max_temp_c;
        if panel_temp_c > max {
            Some(Severity::Critical)
        } else if panel_temp_c > max - self.thresholds.warning_margin_c {
            Some(Severity::Warning)
        } else {
            None
        }
    }

    fn panel_alert(&self, panel_temp_c: f64) -> Option<Alert> {
        let max = self.thresholds.panel.max_temp_c;
        let severity = self.panel_severity(panel_temp_c)?;
        let message = match severity {
            Severity::Critical => format!(
                "Panel temperature {:.1}°C exceeds maximum safe operating temperature {:.1}°C",
                panel_temp_c, max
            ),
            _ => format!(
                "Panel temperature {:.1}°C approaching maximum threshold {:.1}°C",
                panel_temp_c, max
            ),
        };
        Some(Alert::new(
            DeviceType::Panel,
            AlertCategory::Temperature,
            severity,
            panel_temp_c,
            max,
            message,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnvironmentSample;
    use crate::simulation::PhysicalModel;
    use proptest::prelude::*;
    use rstest::rstest;

    fn reading(panel: f64, inverter: f64, efficiency: f64) -> ThermalReading {
        let mut r = PhysicalModel::default().evaluate(&EnvironmentSample::new(20.0, 0.0, 50.0, 2.0, 3.0));
        r.panel_temp_c = panel;
        r.inverter_temp_c = inverter;
        r.efficiency = efficiency;
        r
    }

    fn evaluator() -> AlertEvaluator {
        AlertEvaluator::new(ThresholdTable::reference())
    }

    #[rstest]
    #[case(50.0, None)]
    #[case(60.0, None)]
    #[case(60.1, Some(Severity::Warning))]
    #[case(65.0, Some(Severity::Warning))]
    #[case(65.1, Some(Severity::Critical))]
    #[case(90.0, Some(Severity::Critical))]
    fn test_panel_bands(#[case] panel: f64, #[case] expected: Option<Severity>) {
        let alerts = evaluator().evaluate(&reading(panel, 30.0, 0.95));
        let panel_alert = alerts
            .iter()
            .find(|a| a.device_type == DeviceType::Panel && a.category == AlertCategory::Temperature);
        assert_eq!(panel_alert.map(|a| a.severity), expected);
        // Only one panel temperature alert at a time
        assert!(
            alerts
                .iter()
                .filter(|a| a.category == AlertCategory::Temperature && a.device_type == DeviceType::Panel)
                .count()
                <= 1
        );
    }

    #[rstest]
    #[case(40.0, false)]
    #[case(40.5, true)]
    fn test_inverter_rule(#[case] inverter: f64, #[case] raised: bool) {
        let alerts = evaluator().evaluate(&reading(40.0, inverter, 0.95));
        let found = alerts.iter().any(|a| a.device_type == DeviceType::Inverter);
        assert_eq!(found, raised);
        if raised {
            assert_eq!(alerts[0].severity, Severity::Critical);
            assert_eq!(alerts[0].limit, 40.0);
        }
    }

    #[test]
    fn test_nominal_reading_raises_nothing() {
        assert!(evaluator().evaluate(&reading(45.0, 32.0, 0.92)).is_empty());
    }

    #[test]
    fn test_all_rules_fire_in_order() {
        let alerts = evaluator().evaluate(&reading(72.0, 44.0, 0.75));
        assert_eq!(alerts.len(), 3);

        assert_eq!(alerts[0].device_type, DeviceType::Panel);
        assert_eq!(alerts[0].category, AlertCategory::Temperature);
        assert_eq!(alerts[0].severity, Severity::Critical);

        assert_eq!(alerts[1].device_type, DeviceType::Inverter);

        assert_eq!(alerts[2].device_type, DeviceType::Panel);
        assert_eq!(alerts[2].category, AlertCategory::Efficiency);
        assert_eq!(alerts[2].severity, Severity::Warning);
        assert!(alerts[2].message.contains("75.0%"));
        assert!(alerts.iter().all(|a| !a.resolved && a.resolved_at.is_none()));
    }

    #[test]
    fn test_efficiency_advisory_is_independent() {
        // Cool panel, poor efficiency still advises
        let alerts = evaluator().evaluate(&reading(30.0, 25.0, 0.79));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].category, AlertCategory::Efficiency);
    }

    #[test]
    fn test_evaluation_is_idempotent_and_pure() {
        let r = reading(63.0, 41.0, 0.78);
        let before = r.clone();
        let e = evaluator();
        assert_eq!(e.evaluate(&r), e.evaluate(&r));
        assert_eq!(r, before);
    }

    #[test]
    fn test_threshold_table_validation() {
        assert!(ThresholdTable::reference().validate().is_ok());

        let mut inverted = ThresholdTable::reference();
        inverted.inverter = DeviceThreshold::new(10.0, 20.0);
        assert!(inverted.validate().is_err());

        let mut bad_advisory = ThresholdTable::reference();
        bad_advisory.efficiency_advisory = 0.0;
        assert!(bad_advisory.validate().is_err());

        let mut bad_margin = ThresholdTable::reference();
        bad_margin.warning_margin_c = -1.0;
        assert!(bad_margin.validate().is_err());
    }

    proptest! {
        #[test]
        fn prop_panel_severity_is_monotone(a in -20.0f64..120.0, b in -20.0f64..120.0) {
            let e = evaluator();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(e.panel_severity(lo) <= e.panel_severity(hi));
        }
    }
}
