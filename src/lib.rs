//! Thermal modeling, alerting and cooling-design selection for a solar installation.

pub mod api;
pub mod auth;
pub mod config;
pub mod controller;
pub mod domain;
pub mod export;
pub mod optimizer;
pub mod repo;
pub mod report;
pub mod simulation;
pub mod telemetry;
