use anyhow::{Context, Result};
use chrono::{NaiveDate, Timelike, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use solar_thermal_controller::{
    api,
    config::Config,
    controller::{AppState, ThermalMonitor},
    domain::{default_catalog, DeviceId, EnvironmentSample},
    export::ZoneExporter,
    optimizer::{Constraints, DesignOptimizer},
    report::{self, DocumentFormat},
    simulation::{CoolingConditions, SyntheticWeather},
    telemetry,
};

#[derive(Parser)]
#[command(name = "solar-thermal")]
#[command(about = "Solar installation thermal modeling, alerting and cooling design selection", long_about = None)]
struct Cli {
    /// Configuration file layered over config/default.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cooling result for one operating point of the load-linked model
    Single {
        #[arg(long, default_value_t = 35.0)]
        ambient: f64,
        /// Solar thermal load (kW)
        #[arg(long, default_value_t = 50.0)]
        solar_load: f64,
        #[arg(long, default_value_t = 65.0)]
        humidity: f64,
        #[arg(long, default_value_t = 5.0)]
        wind: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Component temperatures and alerts for one environment sample
    Evaluate {
        #[arg(long)]
        ambient: f64,
        /// Plane-of-array irradiance (W/m²)
        #[arg(long)]
        irradiance: f64,
        #[arg(long, default_value_t = 60.0)]
        humidity: f64,
        #[arg(long, default_value_t = 2.0)]
        wind: f64,
        /// Local hour of day (defaults to the current site hour)
        #[arg(long)]
        hour: Option<f64>,
        #[arg(long)]
        device_id: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Synthetic 24-hour cycle with daily totals
    Daily {
        /// Date label (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rank the cooling design catalog under constraints
    Optimize {
        /// JSON or YAML constraints file
        #[arg(long)]
        constraints: Option<PathBuf>,
        #[arg(long)]
        max_budget: Option<f64>,
        #[arg(long)]
        max_maintenance_hours: Option<f64>,
        #[arg(long)]
        min_efficiency_gain: Option<f64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Continuous monitoring loop on synthetic weather
    Monitor {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
        #[arg(long)]
        interval_secs: Option<u64>,
        #[arg(long)]
        seed: Option<u64>,
        /// Where to write the run summary
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// HTTP API
    Serve {
        /// Also run the monitor loop until shutdown
        #[arg(long)]
        with_monitor: bool,
    },

    /// Thermal zones for BIM tools or spreadsheets
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Bim)]
        format: ExportFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExportFormat {
    Bim,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Single {
            ambient,
            solar_load,
            humidity,
            wind,
            output,
        } => {
            let conditions = CoolingConditions {
                ambient_temp_c: ambient,
                solar_load_kw: solar_load,
                humidity_percent: humidity,
                wind_speed_ms: wind,
            };
            let result = cfg.cooling_simulator().simulate(&conditions);
            info!(
                baseline_temp = result.baseline_temp,
                optimized_temp = result.optimized_temp,
                efficiency_gain = result.efficiency_gain,
                "Cooling simulation complete"
            );
            emit(&result, output.as_deref()).await?;
        }

        Commands::Evaluate {
            ambient,
            irradiance,
            humidity,
            wind,
            hour,
            device_id,
            output,
        } => {
            let hour = match hour {
                Some(h) => h,
                None => {
                    let local = Utc::now().with_timezone(&cfg.monitor.utc_offset()?);
                    f64::from(local.hour()) + f64::from(local.minute()) / 60.0
                }
            };
            let mut metadata = cfg.monitor.metadata();
            if let Some(id) = device_id {
                metadata.device_id = DeviceId::new(id);
            }

            let state = AppState::new(cfg).await?;
            let sample = EnvironmentSample::new(ambient, irradiance, humidity, wind, hour);
            let observation = state.controller.observe(&sample, &metadata).await;
            emit(&observation, output.as_deref()).await?;
        }

        Commands::Daily { date, output } => {
            let simulator = cfg.daily_simulator();
            let date = date.unwrap_or(simulator.profile().default_date);
            let report = simulator.simulate_day(date);
            info!(
                %date,
                productive_steps = report.daily_summary.productive_steps,
                total_energy_gain_kwh = report.daily_summary.total_energy_gain_kwh,
                "Daily cycle simulated"
            );
            emit(&report, output.as_deref()).await?;
        }

        Commands::Optimize {
            constraints,
            max_budget,
            max_maintenance_hours,
            min_efficiency_gain,
            output,
        } => {
            let mut constraints = match constraints {
                Some(path) => load_constraints(&path).await?,
                None => Constraints::default(),
            };
            if let Some(v) = max_budget {
                constraints.max_budget = v;
            }
            if let Some(v) = max_maintenance_hours {
                constraints.max_maintenance_hours = v;
            }
            if let Some(v) = min_efficiency_gain {
                constraints.min_efficiency_gain = v;
            }
            validator::Validate::validate(&constraints).context("Invalid constraints")?;

            let report = DesignOptimizer::new(cfg.economics.clone()).optimize(&default_catalog(), &constraints);
            emit(&report, output.as_deref()).await?;
        }

        Commands::Monitor {
            ticks,
            interval_secs,
            seed,
            output,
        } => {
            let mut cfg = cfg;
            if ticks.is_some() {
                cfg.monitor.max_ticks = ticks;
            }
            if let Some(secs) = interval_secs {
                cfg.monitor.tick_seconds = secs.max(1);
            }
            if seed.is_some() {
                cfg.monitor.weather.random_seed = seed;
            }

            let state = AppState::new(cfg.clone()).await?;
            let stop = CancellationToken::new();
            tokio::spawn({
                let stop = stop.clone();
                async move {
                    telemetry::shutdown_signal().await;
                    stop.cancel();
                }
            });

            let summary = build_monitor(&state)?
                .run(Duration::from_secs(cfg.monitor.tick_seconds), stop)
                .await;
            emit(&summary, output.as_deref()).await?;
        }

        Commands::Serve { with_monitor } => serve(cfg, with_monitor).await?,

        Commands::Export { format, output } => {
            let exporter = ZoneExporter::new(&cfg.site, &cfg.thresholds);
            match format {
                ExportFormat::Csv => {
                    let csv = exporter.to_csv()?;
                    match output {
                        Some(path) => {
                            report::write_text(&path, &csv).await?;
                            info!(path = %path.display(), "Zone CSV written");
                        }
                        None => print!("{csv}"),
                    }
                }
                ExportFormat::Bim => emit(&exporter.bim_document(), output.as_deref()).await?,
            }
        }
    }

    Ok(())
}

fn build_monitor(state: &AppState) -> Result<ThermalMonitor> {
    let monitor = &state.cfg.monitor;
    Ok(ThermalMonitor::new(
        state.controller.clone(),
        SyntheticWeather::new(monitor.weather.clone()),
        monitor.metadata(),
        monitor.utc_offset()?,
    )
    .with_max_ticks(monitor.max_ticks))
}

async fn serve(cfg: Config, with_monitor: bool) -> Result<()> {
    let state = AppState::new(cfg.clone()).await?;
    let app = api::router(state.clone(), &cfg)?;
    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" && cfg.auth.token.is_none() {
        warn!("Server binding to 0.0.0.0 without an auth token; the API is open to the network");
    }

    let stop = CancellationToken::new();
    let monitor_task = if with_monitor {
        let mut monitor = build_monitor(&state)?;
        let period = Duration::from_secs(cfg.monitor.tick_seconds);
        let stop = stop.clone();
        Some(tokio::spawn(async move { monitor.run(period, stop).await }))
    } else {
        None
    };

    info!(%addr, with_monitor, "starting solar thermal controller");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown({
            let stop = stop.clone();
            async move {
                telemetry::shutdown_signal().await;
                stop.cancel();
            }
        })
        .await?;

    stop.cancel();
    if let Some(task) = monitor_task {
        let summary = task.await.context("Monitor task failed")?;
        info!(ticks = summary.ticks, alerts = summary.alerts_raised, "monitor stopped");
    }

    warn!("shutdown complete");
    Ok(())
}

async fn load_constraints(path: &Path) -> Result<Constraints> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let constraints = match DocumentFormat::for_path(path) {
        DocumentFormat::Yaml => serde_yaml::from_str(&text)?,
        DocumentFormat::Json => serde_json::from_str(&text)?,
    };
    Ok(constraints)
}

/// Write to `output`, or pretty JSON on stdout
async fn emit<T: Serialize>(document: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            report::write_document(path, document).await?;
            info!(path = %path.display(), "Result written");
        }
        None => println!("{}", report::render(document, DocumentFormat::Json)?),
    }
    Ok(())
}
