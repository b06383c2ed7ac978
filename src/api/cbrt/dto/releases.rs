/*
 * Responsibility
 * - /cbrt 系の request/response DTO
 * - items は data store 接続までは常に空 (形だけ UI と合わせる)
 */
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::auth::Role;

#[derive(Debug, Serialize)]
pub struct ReleaseListResponse {
    pub ok: bool,
    pub items: Vec<Value>,
    // echo of the requested status filter
    pub status: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseAction {
    Stage,
    Verify,
    Reject,
    Load,
}

#[derive(Debug, Serialize)]
pub struct ReleaseActionResponse {
    pub ok: bool,
    pub rid: String,
    pub action: ReleaseAction,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(rename = "releaseId")]
    pub release_id: Option<String>,
}

impl AuditQuery {
    pub fn validate(&self) -> Result<&str, &'static str> {
        match self.release_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err("releaseId is required"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub ok: bool,
    pub items: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub ok: bool,
    pub uid: String,
    pub email: Option<String>,
    pub role: Role,
}
