/*
 * Responsibility
 * - 認証不要の生存確認 (/ と /api/health)
 */
use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub ok: bool,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub env: String,
    pub version: String,
    pub time: String,
}

pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        ok: true,
        service: state.service.name,
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: state.service.name,
        env: state.service.env.clone(),
        version: state.service.version.clone(),
        time: chrono::Utc::now().to_rfc3339(),
    })
}
