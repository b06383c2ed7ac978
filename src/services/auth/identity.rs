/*
 * Responsibility
 * - gate を通過したリクエストに付与される「認可済みコンテキスト」
 * - middleware が request extensions に格納し、handler は extractor 経由で受け取る
 */
use serde::Serialize;

use crate::services::auth::Role;

/// Identity of an authorized caller, one per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityContext {
    pub subject: String,
    pub email: Option<String>,
    pub role: Role,
}
