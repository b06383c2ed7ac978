use std::{fmt, sync::Arc, time::Duration};

use crate::repos::{RepoError, UserRecord, UserRegistry};
use crate::services::auth::{AuthError, Role};

/// Maps a verified subject to its role through the user registry.
///
/// Lookups are bounded by `timeout` and retried `retries` times on backend
/// failure. When every attempt fails the subject is denied.
#[derive(Clone)]
pub struct RoleResolver {
    registry: Arc<dyn UserRegistry>,
    timeout: Duration,
    retries: u32,
}

impl fmt::Debug for RoleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleResolver")
            .field("registry", &self.registry.backend_name())
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
enum LookupError {
    #[error("registry lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl RoleResolver {
    pub fn new(registry: Arc<dyn UserRegistry>, timeout: Duration, retries: u32) -> Self {
        Self {
            registry,
            timeout,
            retries,
        }
    }

    pub async fn resolve(&self, subject: &str) -> Result<Role, AuthError> {
        let record = self.lookup(subject).await?;
        role_of(record)
    }

    async fn lookup(&self, subject: &str) -> Result<Option<UserRecord>, AuthError> {
        let mut attempt = 0;
        loop {
            let lookup = self.registry.find_user(subject);
            let result = match tokio::time::timeout(self.timeout, lookup).await {
                Ok(found) => found.map_err(LookupError::from),
                Err(_) => Err(LookupError::Timeout(self.timeout)),
            };

            match result {
                Ok(record) => return Ok(record),
                Err(err) if attempt < self.retries => {
                    tracing::debug!(error = %err, subject, attempt, "registry lookup failed; retrying");
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        subject,
                        backend = self.registry.backend_name(),
                        "registry lookup failed"
                    );
                    return Err(AuthError::forbidden("registry unavailable"));
                }
            }
        }
    }
}

/// Interpret a registry record. Missing records and inactive accounts are denied.
fn role_of(record: Option<UserRecord>) -> Result<Role, AuthError> {
    let record = record.ok_or_else(|| AuthError::forbidden("not provisioned"))?;

    if record.status.as_deref() != Some("active") {
        return Err(AuthError::forbidden("disabled"));
    }

    match record.role.as_deref() {
        None | Some("") => Ok(Role::Viewer),
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|_| AuthError::forbidden("unknown role")),
    }
}
