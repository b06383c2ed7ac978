//! Security response headers.
//!
//! The broker serves JSON only, so the policy is "frame nothing, sniff nothing,
//! refer nothing". Existing headers set by a handler win.

use axum::Router;
use axum::http::header::{HeaderName, HeaderValue};
use tower_http::set_header::SetResponseHeaderLayer;

const HEADERS: &[(&str, &str)] = &[
    ("x-frame-options", "DENY"),
    ("content-security-policy", "default-src 'none'; frame-ancestors 'none'"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "no-referrer"),
    ("cache-control", "no-store"),
];

pub fn apply(router: Router) -> Router {
    HEADERS.iter().fold(router, |router, &(name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}
