/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - AuthError (401/403) を統一的に変換
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::AuthError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("unauthenticated: {message}")]
    Unauthenticated { message: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String },
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{resource} not found."),
            ),
            AppError::Unauthenticated { message } => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
            }
            AppError::Forbidden { message } => (StatusCode::FORBIDDEN, "FORBIDDEN", message),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthenticated(message) => AppError::Unauthenticated { message },
            AuthError::Forbidden(message) => AppError::Forbidden { message },
        }
    }
}
