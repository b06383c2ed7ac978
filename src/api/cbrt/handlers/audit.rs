/*
 * Responsibility
 * - GET /cbrt/audit?releaseId=...
 * - releaseId 必須 (欠落は 400)、items は data store 接続まで空
 * - query の形式不正も AppError の envelope で 400
 */
use axum::{
    Json,
    extract::{Query, rejection::QueryRejection},
};

use crate::{
    api::cbrt::{
        dto::releases::{AuditQuery, AuditResponse},
        extractors::Identity,
    },
    error::AppError,
};

pub async fn audit(
    Identity(identity): Identity,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> Result<Json<AuditResponse>, AppError> {
    let Query(query) =
        query.map_err(|rejection| AppError::bad_request("INVALID_QUERY", rejection.body_text()))?;
    let release_id = query
        .validate()
        .map_err(|msg| AppError::bad_request("MISSING_RELEASE_ID", msg))?;

    tracing::debug!(subject = %identity.subject, release_id, "read audit trail");

    Ok(Json(AuditResponse {
        ok: true,
        items: Vec::new(),
    }))
}
