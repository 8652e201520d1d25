//! Thermal-zone export for BIM tools and spreadsheets.
//!
//! Zone limits are looked up in the threshold table through the zone's device class, so the
//! exported figures always match what the alert rules enforce.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::controller::ThresholdTable;
use crate::domain::{DeviceType, GeoPoint};

pub const CSV_HEADER: &str = "Zone,Type,Area_m2,Max_Temp_C,Min_Temp_C,Cooling_Strategy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    SolarPanelArray,
    EquipmentEnclosure,
    BatteryEnclosure,
}

impl ZoneType {
    pub fn device(self) -> DeviceType {
        match self {
            ZoneType::SolarPanelArray => DeviceType::Panel,
            ZoneType::EquipmentEnclosure => DeviceType::Inverter,
            ZoneType::BatteryEnclosure => DeviceType::Battery,
        }
    }

    pub fn cooling_strategy(self) -> &'static str {
        match self {
            ZoneType::SolarPanelArray => "passive_ventilation",
            ZoneType::EquipmentEnclosure => "forced_ventilation",
            ZoneType::BatteryEnclosure => "active_cooling",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ZoneType::SolarPanelArray => "solar_panel_array",
            ZoneType::EquipmentEnclosure => "equipment_enclosure",
            ZoneType::BatteryEnclosure => "battery_enclosure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalZone {
    pub zone_id: String,
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    pub area_m2: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_m3: Option<f64>,
    /// Free-form material data passed through to the BIM document
    #[serde(default)]
    pub thermal_properties: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub name: String,
    pub location: GeoPoint,
    pub climate_zone: String,
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub project: SiteInfo,
    pub winter_design_low_c: f64,
    pub summer_design_high_c: f64,
    pub zones: Vec<ThermalZone>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let props = |pairs: &[(&str, serde_json::Value)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>()
        };

        Self {
            project: SiteInfo {
                name: "Urgam Valley Solar Installation".to_string(),
                location: GeoPoint {
                    lat: 30.1652,
                    lng: 78.8487,
                },
                climate_zone: "Himalayas_Subtropical".to_string(),
                altitude_m: 1652.0,
            },
            winter_design_low_c: -5.0,
            summer_design_high_c: 42.0,
            zones: vec![
                ThermalZone {
                    zone_id: "SOLAR_ARRAY_001".to_string(),
                    zone_type: ZoneType::SolarPanelArray,
                    area_m2: 500.0,
                    volume_m3: None,
                    thermal_properties: props(&[
                        ("thermal_mass", "low".into()),
                        ("heat_capacity", 900.into()),
                        ("emissivity", 0.90.into()),
                        ("absorptance", 0.95.into()),
                    ]),
                },
                ThermalZone {
                    zone_id: "INVERTER_ROOM".to_string(),
                    zone_type: ZoneType::EquipmentEnclosure,
                    area_m2: 25.0,
                    volume_m3: Some(75.0),
                    thermal_properties: props(&[
                        ("thermal_mass", "medium".into()),
                        ("insulation_r_value", 15.into()),
                        ("air_changes_per_hour", 8.into()),
                    ]),
                },
                ThermalZone {
                    zone_id: "BATTERY_STORAGE".to_string(),
                    zone_type: ZoneType::BatteryEnclosure,
                    area_m2: 20.0,
                    volume_m3: Some(60.0),
                    thermal_properties: props(&[
                        ("thermal_mass", "high".into()),
                        ("insulation_r_value", 20.into()),
                        ("temperature_control", "active_cooling".into()),
                    ]),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub zone_id: String,
    pub zone_type: ZoneType,
    pub area_m2: f64,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub cooling_strategy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DesignTemperatures {
    pub winter_design_low: f64,
    pub summer_design_high: f64,
    pub panel_operating_range: [f64; 2],
    pub ambient_operating_range: [f64; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct ThermalAnalysis {
    pub design_temperatures: DesignTemperatures,
    pub zone_limits: Vec<ZoneSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BimDocument {
    pub project: SiteInfo,
    pub thermal_zones: Vec<ThermalZone>,
    pub thermal_analysis: ThermalAnalysis,
}

pub struct ZoneExporter<'a> {
    site: &'a SiteConfig,
    thresholds: &'a ThresholdTable,
}

impl<'a> ZoneExporter<'a> {
    pub fn new(site: &'a SiteConfig, thresholds: &'a ThresholdTable) -> Self {
        Self { site, thresholds }
    }

    pub fn summaries(&self) -> Vec<ZoneSummary> {
        self.site
            .zones
            .iter()
            .map(|zone| {
                let limits = self.thresholds.for_device(zone.zone_type.device());
                ZoneSummary {
                    zone_id: zone.zone_id.clone(),
                    zone_type: zone.zone_type,
                    area_m2: zone.area_m2,
                    max_temp_c: limits.max_temp_c,
                    min_temp_c: limits.min_temp_c,
                    cooling_strategy: zone.zone_type.cooling_strategy().to_string(),
                }
            })
            .collect()
    }

    pub fn bim_document(&self) -> BimDocument {
        let panel = &self.thresholds.panel;
        BimDocument {
            project: self.site.project.clone(),
            thermal_zones: self.site.zones.clone(),
            thermal_analysis: ThermalAnalysis {
                design_temperatures: DesignTemperatures {
                    winter_design_low: self.site.winter_design_low_c,
                    summer_design_high: self.site.summer_design_high_c,
                    panel_operating_range: [panel.min_temp_c, panel.max_temp_c],
                    ambient_operating_range: [self.thresholds.ambient_min_c, self.thresholds.ambient_max_c],
                },
                zone_limits: self.summaries(),
            },
        }
    }

    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut w = csv::Writer::from_writer(Vec::new());
        w.write_record(CSV_HEADER.split(','))?;
        for s in self.summaries() {
            w.write_record([
                s.zone_id,
                s.zone_type.as_str().to_string(),
                s.area_m2.to_string(),
                s.max_temp_c.to_string(),
                s.min_temp_c.to_string(),
                s.cooling_strategy,
            ])?;
        }
        let bytes = w.into_inner().map_err(|e| anyhow::anyhow!("CSV flush failed: {}", e.error()))?;
        Ok(String::from_utf8(bytes)?)
    }
}
