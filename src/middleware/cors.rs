//! CORS policy for the browser UI.
//!
//! Note:
//! - CORS is enforced by browsers only; it is not an access control for this API.
//!   The role gate is.
//! - Apply at the Router level (not inside handlers).
//!
//! Policy:
//! - Exact-match allow-list from `ALLOWED_ORIGINS`, plus an optional regex for
//!   hosting preview channels (`ALLOWED_ORIGIN_REGEX`).
//! - No credentials; the bearer token travels in the `Authorization` header.
//! - Preflight responses cached for 24 hours.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use regex::Regex;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;

/// Apply the CORS policy to the given Router.
pub fn apply(router: Router, config: &Config) -> Router {
    router.layer(layer(
        &config.cors_allowed_origins,
        config.cors_allowed_origin_regex.clone(),
    ))
}

fn layer(allowed_origins: &[String], origin_regex: Option<Regex>) -> CorsLayer {
    // An empty allow-list with no regex allows nothing, which is the safe default.
    let allowed: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();

    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _req| {
        origin_allowed(origin, &allowed, origin_regex.as_ref())
    });

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(false)
        .max_age(Duration::from_secs(24 * 60 * 60))
}

fn origin_allowed(origin: &HeaderValue, allowed: &[HeaderValue], regex: Option<&Regex>) -> bool {
    if allowed.iter().any(|v| v == origin) {
        return true;
    }
    match (regex, origin.to_str()) {
        (Some(regex), Ok(origin)) => regex.is_match(origin),
        _ => false,
    }
}
