use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::IdentityContext;

/// Handler で IdentityContext を受け取るための extractor
/// ロールゲート (middleware::auth::access) が extensions に insert 済みである前提
/// 見つからない場合は 401 (ゲートが掛かっていないルート)
pub struct Identity(pub IdentityContext);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .cloned()
            .map(Identity)
            .ok_or_else(|| AppError::unauthenticated("no identity on request"))
    }
}
