/*
 * Responsibility
 * - /cbrt の URL 構造と、ルートごとの最小ロールを定義
 * - ロールゲートは access::apply で route 単位に掛ける (route_layer)
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::cbrt::handlers::{
    audit::audit,
    me::me,
    releases::{list_releases, load_release, reject_release, stage_release, verify_release},
};
use crate::middleware::auth::access;
use crate::services::auth::Role;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/releases", access::apply(get(list_releases), state, Role::Viewer))
        .route("/me", get(me))
        .route(
            "/releases/{rid}/stage",
            access::apply(post(stage_release), state, Role::Loader),
        )
        .route(
            "/releases/{rid}/load",
            access::apply(post(load_release), state, Role::Loader),
        )
        .route(
            "/releases/{rid}/verify",
            access::apply(post(verify_release), state, Role::Supervisor),
        )
        .route(
            "/releases/{rid}/reject",
            access::apply(post(reject_release), state, Role::Supervisor),
        )
        .route("/audit", access::apply(get(audit), state, Role::Viewer))
}
