/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - gate: 起動時に一度だけ組み立てた AuthGate (JWKS キャッシュ / registry handle を内包)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::AuthGate;

/// Deployment facts reported by the health endpoint.
#[derive(Debug)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub env: String,
    pub version: String,
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub gate: AuthGate,
    pub service: Arc<ServiceInfo>,
}

impl AppState {
    pub fn new(gate: AuthGate, service: ServiceInfo) -> Self {
        Self {
            gate,
            service: Arc::new(service),
        }
    }
}
