use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::time::Instant;
use tracing::info;
use validator::Validate;

use super::error::ApiError;
use super::response::{ok, ApiResponse};
use crate::{
    auth::{require_bearer, BearerAuth},
    config::Config,
    controller::{AppState, Observation},
    domain::{AlertRecord, CoolingDesign, DeviceId, EnvironmentSample, ReadingRecord},
    export::{ZoneExporter, ZoneSummary},
    optimizer::{Constraints, OptimizationReport},
    simulation::{CoolingConditions, CoolingResult, DailyCycleReport},
};

pub fn router(state: AppState, cfg: &Config) -> Router {
    let auth = BearerAuth::new(cfg.auth.token.as_deref());

    let protected = Router::new()
        .route("/thermal/evaluate", post(evaluate))
        .route("/thermal/cooling", post(simulate_cooling))
        .route("/thermal/daily", get(simulate_daily))
        .route("/designs", get(list_designs))
        .route("/designs/optimize", post(optimize_designs))
        .route("/devices/:device_id/latest", get(latest_reading))
        .route("/devices/:device_id/alerts", get(unresolved_alerts))
        .route("/alerts/:alert_id/resolve", post(resolve_alert))
        .route("/site/zones", get(site_zones))
        .route("/site/zones.csv", get(site_zones_csv))
        .route_layer(middleware::from_fn_with_state(auth, require_bearer));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(protected)
        .with_state(state)
}

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    pub device_id: Option<String>,
}

/// Evaluate one sample, raise alerts and persist both
pub async fn evaluate(
    State(st): State<AppState>,
    Query(q): Query<DeviceQuery>,
    Json(sample): Json<EnvironmentSample>,
) -> Result<ApiResponse<Observation>, ApiError> {
    let mut metadata = st.cfg.monitor.metadata();
    if let Some(id) = q.device_id.filter(|id| !id.is_empty()) {
        metadata.device_id = DeviceId::new(id);
    }
    let observation = st.controller.observe(&sample, &metadata).await;
    Ok(ok(observation))
}

pub async fn simulate_cooling(
    State(st): State<AppState>,
    Json(conditions): Json<CoolingConditions>,
) -> Result<ApiResponse<CoolingResult>, ApiError> {
    Ok(ok(st.cooling.simulate(&conditions)))
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<NaiveDate>,
}

pub async fn simulate_daily(
    State(st): State<AppState>,
    Query(q): Query<DailyQuery>,
) -> Result<ApiResponse<DailyCycleReport>, ApiError> {
    let started = Instant::now();
    let date = q.date.unwrap_or(st.daily.profile().default_date);
    let report = st.daily.simulate_day(date);
    Ok(ok(report).with_duration(started.elapsed().as_millis() as u64))
}

pub async fn list_designs(State(st): State<AppState>) -> Result<ApiResponse<Vec<CoolingDesign>>, ApiError> {
    let designs = st.catalog.as_ref().clone();
    let count = designs.len();
    Ok(ok(designs).with_count(count))
}

/// Rank the catalog; an empty body uses the default constraints
pub async fn optimize_designs(
    State(st): State<AppState>,
    body: Bytes,
) -> Result<ApiResponse<OptimizationReport>, ApiError> {
    let constraints: Constraints = if body.iter().all(u8::is_ascii_whitespace) {
        Constraints::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("invalid constraints: {e}")))?
    };
    constraints.validate()?;

    let report = st.optimizer.optimize(&st.catalog, &constraints);
    Ok(ok(report))
}

pub async fn latest_reading(
    State(st): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<ApiResponse<ReadingRecord>, ApiError> {
    let device_id = DeviceId::new(device_id);
    st.repos
        .series
        .latest_reading(&device_id)
        .await?
        .map(ok)
        .ok_or_else(|| ApiError::NotFound(format!("no readings for device {device_id}")))
}

pub async fn unresolved_alerts(
    State(st): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<ApiResponse<Vec<AlertRecord>>, ApiError> {
    let alerts = st.repos.series.unresolved_alerts(&DeviceId::new(device_id)).await?;
    let count = alerts.len();
    Ok(ok(alerts).with_count(count))
}

pub async fn resolve_alert(
    State(st): State<AppState>,
    Path(alert_id): Path<i64>,
) -> Result<ApiResponse<AlertRecord>, ApiError> {
    let record = st.repos.resolution.resolve_alert(alert_id, Utc::now()).await?;
    info!(alert_id, device_id = %record.device_id, "Alert resolved");
    Ok(ok(record))
}

pub async fn site_zones(State(st): State<AppState>) -> Result<ApiResponse<Vec<ZoneSummary>>, ApiError> {
    let zones = ZoneExporter::new(&st.cfg.site, &st.cfg.thresholds).summaries();
    let count = zones.len();
    Ok(ok(zones).with_count(count))
}

pub async fn site_zones_csv(State(st): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let csv = ZoneExporter::new(&st.cfg.site, &st.cfg.thresholds).to_csv()?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::Repositories;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> AppState {
        let cfg = Config::load(None).unwrap();
        let repos = Repositories::in_memory(cfg.store.retry.clone());
        AppState::with_repos(cfg, repos)
    }

    #[tokio::test]
    async fn test_healthz_is_open() {
        let st = state();
        let mut cfg = st.cfg.clone();
        cfg.auth.token = Some("secret".into());
        let app = router(st, &cfg);

        let res = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_optimize_with_empty_body_uses_defaults() {
        let st = state();
        let cfg = st.cfg.clone();
        let app = router(st, &cfg);

        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/designs/optimize")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["recommended"]["name"], "Basic Terracotta Vents");
    }

    #[tokio::test]
    async fn test_optimize_rejects_invalid_constraints() {
        let st = state();
        let cfg = st.cfg.clone();
        let app = router(st, &cfg);

        let res = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/designs/optimize")
                    .body(Body::from(r#"{"min_efficiency_gain": 2.0}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
