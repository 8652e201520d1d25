pub mod alerts;
pub mod monitor;

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::{default_catalog, Alert, CoolingDesign, EnvironmentSample, SampleMetadata, ThermalReading};
use crate::optimizer::DesignOptimizer;
use crate::repo::{Repositories, TimeSeriesStore};
use crate::simulation::{CoolingSimulator, DailyCycleSimulator, PhysicalModel};

pub use alerts::{AlertEvaluator, DeviceThreshold, ThresholdTable};
pub use monitor::{MonitorSummary, ThermalMonitor, TickOutcome};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub controller: Arc<ThermalController>,
    pub cooling: Arc<CoolingSimulator>,
    pub daily: Arc<DailyCycleSimulator>,
    pub optimizer: Arc<DesignOptimizer>,
    pub catalog: Arc<Vec<CoolingDesign>>,
    pub repos: Repositories,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let repos = Repositories::new(&cfg).await?;
        Ok(Self::with_repos(cfg, repos))
    }

    pub fn with_repos(cfg: Config, repos: Repositories) -> Self {
        let controller = Arc::new(ThermalController::new(
            cfg.physical_model(),
            AlertEvaluator::new(cfg.thresholds.clone()),
            repos.series.clone(),
        ));

        Self {
            controller,
            cooling: Arc::new(cfg.cooling_simulator()),
            daily: Arc::new(cfg.daily_simulator()),
            optimizer: Arc::new(DesignOptimizer::new(cfg.economics.clone())),
            catalog: Arc::new(default_catalog()),
            repos,
            cfg,
        }
    }
}

/// Outcome of one evaluate-then-persist cycle.
///
/// The reading and alerts are always present; a storage failure only clears `persisted`.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub reading: ThermalReading,
    pub alerts: Vec<Alert>,
    pub reading_id: Option<i64>,
    pub alert_ids: Vec<i64>,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
}

/// Physical model → alert rules → time-series store
pub struct ThermalController {
    model: PhysicalModel,
    evaluator: AlertEvaluator,
    store: Arc<dyn TimeSeriesStore>,
}

impl ThermalController {
    pub fn new(model: PhysicalModel, evaluator: AlertEvaluator, store: Arc<dyn TimeSeriesStore>) -> Self {
        Self {
            model,
            evaluator,
            store,
        }
    }

    pub fn model(&self) -> &PhysicalModel {
        &self.model
    }

    pub fn evaluator(&self) -> &AlertEvaluator {
        &self.evaluator
    }

    /// Evaluate without touching the store
    pub fn assess(&self, sample: &EnvironmentSample) -> (ThermalReading, Vec<Alert>) {
        let reading = self.model.evaluate(sample);
        let alerts = self.evaluator.evaluate(&reading);
        (reading, alerts)
    }

    pub async fn observe(&self, sample: &EnvironmentSample, metadata: &SampleMetadata) -> Observation {
        let (reading, alerts) = self.assess(sample);
        let mut observation = Observation {
            reading,
            alerts,
            reading_id: None,
            alert_ids: Vec::new(),
            persisted: false,
            persist_error: None,
        };

        match self.store.append_reading(&observation.reading, metadata).await {
            Ok(record) => observation.reading_id = Some(record.id),
            Err(e) => {
                warn!(device_id = %metadata.device_id, error = %e, "Failed to persist thermal reading");
                observation.persist_error = Some(e.to_string());
                return observation;
            }
        }

        if !observation.alerts.is_empty() {
            match self.store.append_alerts(&metadata.device_id, &observation.alerts).await {
                Ok(records) => observation.alert_ids = records.iter().map(|r| r.id).collect(),
                Err(e) => {
                    warn!(device_id = %metadata.device_id, error = %e, "Failed to persist thermal alerts");
                    observation.persist_error = Some(e.to_string());
                    return observation;
                }
            }
        }

        observation.persisted = true;
        debug!(
            device_id = %metadata.device_id,
            panel_temp_c = observation.reading.panel_temp_c,
            efficiency = observation.reading.efficiency,
            alerts = observation.alerts.len(),
            "Observation persisted"
        );
        observation
    }
}
