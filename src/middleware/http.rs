//! Transport-level middleware applied to every route.
//!
//! Responsibility:
//! - Request-Id generation + propagation (`x-request-id`)
//! - Access logging (TraceLayer)
//! - Body size limit (the API takes no request bodies beyond small JSON)
//! - Global request timeout
//!
//! The role gate's own I/O (JWKS fetch, registry lookup) has tighter bounds of
//! its own; this timeout is the outer backstop.

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::{StatusCode, header::HeaderName};
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn apply(router: Router, config: &Config) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let layers = ServiceBuilder::new()
        // Timeouts surface as errors from the inner stack; turn them into responses.
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            if err.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                tracing::error!(error = %err, "unhandled middleware error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }))
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(RequestBodyLimitLayer::new(config.http_body_limit_bytes))
        .layer(TimeoutLayer::new(config.http_request_timeout))
        .layer(TraceLayer::new_for_http());

    router.layer(layers)
}
