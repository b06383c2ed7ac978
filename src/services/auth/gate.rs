//! Authorization gate: token → subject → role → rank check.
//!
//! Each call runs the pipeline once, start to finish:
//! `Start → TokenVerified → SubjectExtracted → RoleResolved → Authorized`,
//! and any step may end in a rejection. Nothing is cached between calls, so a
//! role or status change in the registry takes effect on the next request.

use std::sync::Arc;

use crate::services::auth::{
    AuthError, IdTokenClaims, IdTokenVerifier, IdentityContext, Role, RoleResolver,
};

#[derive(Clone, Debug)]
pub struct AuthGate {
    verifier: Arc<IdTokenVerifier>,
    resolver: RoleResolver,
    // When false, `identify` falls back to viewer on resolver failure.
    self_info_fail_closed: bool,
}

impl AuthGate {
    pub fn new(verifier: Arc<IdTokenVerifier>, resolver: RoleResolver) -> Self {
        Self {
            verifier,
            resolver,
            self_info_fail_closed: false,
        }
    }

    pub fn with_self_info_fail_closed(mut self, fail_closed: bool) -> Self {
        self.self_info_fail_closed = fail_closed;
        self
    }

    /// Authorize a request for an operation gated at `minimum`.
    pub async fn authorize(
        &self,
        authorization: Option<&str>,
        minimum: Role,
    ) -> Result<IdentityContext, AuthError> {
        let claims = self.verifier.verify(authorization).await?;
        let subject = subject_of(&claims)?;
        let role = self.resolver.resolve(subject).await?;

        if !role.satisfies(minimum) {
            tracing::info!(subject, %role, %minimum, "insufficient role");
            return Err(AuthError::forbidden(format!(
                "role '{role}' insufficient for '{minimum}'"
            )));
        }

        Ok(IdentityContext {
            subject: subject.to_string(),
            email: claims.email,
            role,
        })
    }

    /// Identity for the self-info endpoint: token verification only.
    ///
    /// Any resolver failure (including registry outages) reports the caller as
    /// a viewer unless the gate was built with `with_self_info_fail_closed(true)`.
    pub async fn identify(&self, authorization: Option<&str>) -> Result<IdentityContext, AuthError> {
        let claims = self.verifier.verify(authorization).await?;
        let subject = subject_of(&claims)?;

        let role = match self.resolver.resolve(subject).await {
            Ok(role) => role,
            Err(err) if !self.self_info_fail_closed => {
                tracing::warn!(subject, error = %err, "self-info role unresolved; reporting viewer");
                Role::Viewer
            }
            Err(err) => return Err(err),
        };

        Ok(IdentityContext {
            subject: subject.to_string(),
            email: claims.email,
            role,
        })
    }
}

fn subject_of(claims: &IdTokenClaims) -> Result<&str, AuthError> {
    claims
        .subject()
        .ok_or_else(|| AuthError::unauthenticated("no subject in token"))
}
