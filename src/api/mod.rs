/*
 * Responsibility
 * - 公開ルート (/, /api/health) と /cbrt のネスト
 * - どのルートにも一致しない場合は JSON の 404
 */
pub mod cbrt;
pub mod health;

use axum::{Router, routing::get};

use crate::{error::AppError, state::AppState};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(health::root))
        .route("/api/health", get(health::health))
        .nest("/cbrt", cbrt::routes(state))
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::not_found("route")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::repos::UserRecord;
    use crate::repos::user_repo::memory::InMemoryUserRegistry;
    use crate::services::auth::id_token::tests::{bearer, claims_for, now, verifier};
    use crate::services::auth::{AuthGate, RoleResolver};
    use crate::state::ServiceInfo;

    async fn app() -> Router {
        let registry = Arc::new(InMemoryUserRegistry::default());
        registry.upsert("u-viewer", UserRecord::active(Some("viewer"))).await;
        registry.upsert("u-loader", UserRecord::active(Some("loader"))).await;
        registry
            .upsert("u-supervisor", UserRecord::active(Some("Supervisor")))
            .await;
        registry
            .upsert("u-disabled", UserRecord::with_status("disabled", Some("admin")))
            .await;

        let resolver = RoleResolver::new(registry, Duration::from_secs(1), 0);
        let gate = AuthGate::new(Arc::new(verifier()), resolver);
        let state = AppState::new(
            gate,
            ServiceInfo {
                name: "broker",
                env: "test".to_string(),
                version: "v-test".to_string(),
            },
        );

        router(&state).with_state(state)
    }

    async fn send(
        method: Method,
        uri: &str,
        subject: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(subject) = subject {
            builder = builder.header(header::AUTHORIZATION, bearer(&claims_for(subject)));
        }
        let request = builder.body(Body::empty()).unwrap();

        let response = app().await.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn public_routes_need_no_token() {
        let (status, body) = send(Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "service": "broker" }));

        let (status, body) = send(Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["env"], "test");
        assert_eq!(body["version"], "v-test");
        assert!(body["time"].is_string());
    }

    #[tokio::test]
    async fn gated_route_without_token_is_401() {
        let (status, body) = send(Method::GET, "/cbrt/releases", None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
        assert_eq!(body["error"]["message"], "missing bearer token");
    }

    #[tokio::test]
    async fn expired_token_is_401() {
        let mut claims = claims_for("u-loader");
        claims["exp"] = json!(now() - 60);
        let request = Request::builder()
            .uri("/cbrt/releases")
            .header(header::AUTHORIZATION, bearer(&claims))
            .body(Body::empty())
            .unwrap();

        let response = app().await.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn viewer_can_list_and_status_filter_is_echoed() {
        let (status, body) = send(
            Method::GET,
            "/cbrt/releases?status=staged&status=verified",
            Some("u-viewer"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "ok": true, "items": [], "status": ["staged", "verified"] })
        );
    }

    #[tokio::test]
    async fn viewer_cannot_stage() {
        let (status, body) = send(Method::POST, "/cbrt/releases/r1/stage", Some("u-viewer")).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["message"], "role 'viewer' insufficient for 'loader'");
    }

    #[tokio::test]
    async fn loader_can_stage_and_load_but_not_verify() {
        let (status, body) = send(Method::POST, "/cbrt/releases/r1/stage", Some("u-loader")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "rid": "r1", "action": "stage" }));

        let (status, body) = send(Method::POST, "/cbrt/releases/r1/load", Some("u-loader")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "load");

        let (status, body) = send(Method::POST, "/cbrt/releases/r1/verify", Some("u-loader")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["message"], "role 'loader' insufficient for 'supervisor'");
    }

    #[tokio::test]
    async fn supervisor_can_verify_and_reject() {
        for action in ["verify", "reject"] {
            let uri = format!("/cbrt/releases/r-9/{action}");
            let (status, body) = send(Method::POST, &uri, Some("u-supervisor")).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["rid"], "r-9");
            assert_eq!(body["action"], action);
        }
    }

    #[tokio::test]
    async fn registry_denials_are_403() {
        let (status, body) = send(Method::GET, "/cbrt/releases", Some("u-disabled")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["message"], "disabled");

        let (status, body) = send(Method::GET, "/cbrt/releases", Some("u-unknown")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["message"], "not provisioned");
    }

    #[tokio::test]
    async fn audit_requires_release_id() {
        let (status, body) = send(Method::GET, "/cbrt/audit", Some("u-viewer")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_RELEASE_ID");

        let (status, body) = send(Method::GET, "/cbrt/audit?releaseId=r1", Some("u-viewer")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "items": [] }));
    }

    #[tokio::test]
    async fn malformed_audit_query_uses_error_envelope() {
        let (status, body) = send(
            Method::GET,
            "/cbrt/audit?releaseId=r1&releaseId=r2",
            Some("u-viewer"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_QUERY");
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn audit_is_gated_before_validation() {
        let (status, _) = send(Method::GET, "/cbrt/audit", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_reports_role_and_falls_back_to_viewer() {
        let (status, body) = send(Method::GET, "/cbrt/me", Some("u-supervisor")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "ok": true,
                "uid": "u-supervisor",
                "email": "u-supervisor@example.com",
                "role": "supervisor"
            })
        );

        let (status, body) = send(Method::GET, "/cbrt/me", Some("u-unknown")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "viewer");

        let (status, _) = send(Method::GET, "/cbrt/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, body) = send(Method::GET, "/cbrt/nope", Some("u-viewer")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn wrong_method_is_405_not_401() {
        let (status, _) = send(Method::GET, "/cbrt/releases/r1/stage", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
