/*
 * Responsibility
 * - GET /cbrt/me: トークン検証のみで自分の uid / email / role を返す
 * - ロールゲートを通さない唯一の /cbrt ルート (解決できない role は viewer 扱い; ME_FAIL_CLOSED で変更可)
 */
use axum::{Json, extract::State, http::HeaderMap};

use crate::{
    api::cbrt::dto::releases::MeResponse, error::AppError,
    middleware::auth::access::authorization_header, state::AppState,
};

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let authorization = authorization_header(&headers);

    let identity = state
        .gate
        .identify(authorization.as_deref())
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "self-info rejected");
            AppError::from(err)
        })?;

    Ok(Json(MeResponse {
        ok: true,
        uid: identity.subject,
        email: identity.email,
        role: identity.role,
    }))
}
