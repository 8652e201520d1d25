pub mod error;
pub mod response;
pub mod v1;

use anyhow::Result;
use axum::{http::StatusCode, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, controller::AppState};

pub fn router(state: AppState, cfg: &Config) -> Result<Router> {
    let mut router = Router::new().nest("/api/v1", v1::router(state, cfg));

    if cfg.server.enable_cors {
        use tower_http::cors::AllowOrigin;
        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::exact(cfg.server.cors_origin.parse()?))
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::AUTHORIZATION, axum::http::header::CONTENT_TYPE]);
        router = router.layer(cors);
    }

    Ok(router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(256 * 1024))
                .layer(timeout_layer(cfg.server.request_timeout_secs)),
        )
        .layer(TraceLayer::new_for_http()))
}

/// Requests running past the limit are answered with 408
fn timeout_layer(secs: u64) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(secs))
}
