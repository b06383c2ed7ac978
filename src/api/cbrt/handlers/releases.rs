/*
 * Responsibility
 * - release lifecycle (stage → verify/reject → load) の handler
 * - 認可はルート登録時のロールゲートで済んでいる前提; ここでは Identity を受けて記録する
 * - 状態遷移そのものは data store 接続後に実装 (今は固定レスポンス)
 */
use axum::{
    Json,
    extract::{Path, RawQuery},
};

use crate::api::cbrt::{
    dto::releases::{ReleaseAction, ReleaseActionResponse, ReleaseListResponse},
    extractors::Identity,
};

pub async fn list_releases(
    Identity(identity): Identity,
    RawQuery(query): RawQuery,
) -> Json<ReleaseListResponse> {
    let status = status_filter(query.as_deref());
    tracing::debug!(subject = %identity.subject, ?status, "list releases");

    Json(ReleaseListResponse {
        ok: true,
        items: Vec::new(),
        status,
    })
}

/// Repeated `status` parameters, in request order (`?status=a&status=b`).
fn status_filter(query: Option<&str>) -> Vec<String> {
    let Some(query) = query else {
        return Vec::new();
    };
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == "status")
        .map(|(_, value)| value.into_owned())
        .collect()
}

async fn release_action(
    identity: Identity,
    rid: String,
    action: ReleaseAction,
) -> Json<ReleaseActionResponse> {
    let Identity(identity) = identity;
    tracing::info!(
        subject = %identity.subject,
        role = %identity.role,
        rid = %rid,
        ?action,
        "release action"
    );

    Json(ReleaseActionResponse {
        ok: true,
        rid,
        action,
    })
}

pub async fn stage_release(
    identity: Identity,
    Path(rid): Path<String>,
) -> Json<ReleaseActionResponse> {
    release_action(identity, rid, ReleaseAction::Stage).await
}

pub async fn verify_release(
    identity: Identity,
    Path(rid): Path<String>,
) -> Json<ReleaseActionResponse> {
    release_action(identity, rid, ReleaseAction::Verify).await
}

pub async fn reject_release(
    identity: Identity,
    Path(rid): Path<String>,
) -> Json<ReleaseActionResponse> {
    release_action(identity, rid, ReleaseAction::Reject).await
}

pub async fn load_release(
    identity: Identity,
    Path(rid): Path<String>,
) -> Json<ReleaseActionResponse> {
    release_action(identity, rid, ReleaseAction::Load).await
}
