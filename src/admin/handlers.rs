use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::http::ErrorBody;
use crate::resilience::BreakerSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_breakers(State(state): State<AdminState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.breakers.snapshots())
}

pub async fn reset_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, (StatusCode, Json<ErrorBody>)> {
    let breaker = state.breakers.find(&name).ok_or_else(|| unknown_breaker(&name))?;
    breaker.reset();
    tracing::info!(breaker = %name, "Breaker reset by operator");
    Ok(Json(breaker.snapshot()))
}

pub async fn trip_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, (StatusCode, Json<ErrorBody>)> {
    let breaker = state.breakers.find(&name).ok_or_else(|| unknown_breaker(&name))?;
    breaker.trip();
    tracing::warn!(breaker = %name, "Breaker tripped by operator");
    Ok(Json(breaker.snapshot()))
}

fn unknown_breaker(name: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new("not_found", format!("No circuit breaker named '{}'", name))),
    )
}
