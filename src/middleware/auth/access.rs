//! Role gate for individual routes: bearer token → role check → `IdentityContext` in extensions.
//!
//! - Verification and role resolution live in `AuthGate`; this module only wires it into axum.
//! - Rejections never reach the handler.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use crate::error::AppError;
use crate::services::auth::{AuthGate, Role};
use crate::state::AppState;

/// Middleware state: the shared gate plus the route's minimum role.
#[derive(Clone, Debug)]
pub struct RequireRole {
    gate: AuthGate,
    minimum: Role,
}

/// Gate `route` at `minimum`.
///
/// The minimum role is a typed `Role`, fixed when the route is registered.
///
/// 例：
/// ```ignore
/// .route("/releases/{rid}/stage", access::apply(post(stage_release), &state, Role::Loader))
/// ```
pub fn apply(
    route: MethodRouter<AppState>,
    state: &AppState,
    minimum: Role,
) -> MethodRouter<AppState> {
    let guard = RequireRole {
        gate: state.gate.clone(),
        minimum,
    };
    // route_layer so unmatched methods still get 405 rather than 401
    route.route_layer(middleware::from_fn_with_state(guard, access_middleware))
}

/// `Authorization` header as text; non-UTF-8 values count as missing.
pub fn authorization_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn access_middleware(
    State(guard): State<RequireRole>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = authorization_header(req.headers());

    let identity = match guard
        .gate
        .authorize(authorization.as_deref(), guard.minimum)
        .await
    {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(
                error = %err,
                method = %req.method(),
                path = %req.uri().path(),
                minimum = %guard.minimum,
                "request rejected by role gate"
            );
            return Err(err.into());
        }
    };

    tracing::debug!(subject = %identity.subject, role = %identity.role, "request authorized");

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
