/// Factory: build the `AuthGate` from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::repos::UserRegistry;
use crate::services::auth::keys::{KeyError, RemoteJwks, SigningKeys, StaticKeys};
use crate::services::auth::{AuthGate, IdTokenPolicy, IdTokenVerifier, RoleResolver};

pub fn build_auth_gate(
    config: &Config,
    registry: Arc<dyn UserRegistry>,
) -> Result<AuthGate, KeyError> {
    let keys: Arc<dyn SigningKeys> = match &config.auth_jwks_file {
        Some(path) => {
            tracing::warn!(path = %path.display(), "using static signing keys from file");
            Arc::new(StaticKeys::from_file(path)?)
        }
        None => Arc::new(RemoteJwks::new(
            config.auth_jwks_url.as_str(),
            config.auth_jwks_ttl,
            config.auth_jwks_timeout,
        )?),
    };

    let policy = IdTokenPolicy {
        issuer_prefix: config.auth_issuer_prefix.clone(),
        clock_skew_seconds: config.auth_clock_skew_seconds,
        ..IdTokenPolicy::for_project(config.auth_project.as_str())
    };
    let verifier = IdTokenVerifier::new(keys, policy);

    let resolver = RoleResolver::new(registry, config.registry_timeout, config.registry_retries);

    Ok(AuthGate::new(Arc::new(verifier), resolver)
        .with_self_info_fail_closed(config.me_fail_closed))
}
