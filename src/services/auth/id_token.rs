use std::{fmt, sync::Arc};

use jsonwebtoken::{Algorithm, Validation, errors::ErrorKind};
use serde::Deserialize;
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::auth::keys::{KeyError, SigningKeys};

/// Firebase issues ID tokens with `iss = https://securetoken.google.com/<project>`.
pub const SECURETOKEN_ISSUER_BASE: &str = "https://securetoken.google.com/";

pub fn issuer_prefix_for(project: &str) -> String {
    format!("{SECURETOKEN_ISSUER_BASE}{project}")
}

/// Claims of a verified provider ID token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub aud: String,
    pub exp: i64,

    // Subject lives under one of two names depending on the token source.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

impl IdTokenClaims {
    /// Subject identifier: `user_id` first, then `uid`. Empty values are ignored.
    pub fn subject(&self) -> Option<&str> {
        [self.user_id.as_deref(), self.uid.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
    }
}

// Errors returned by ID-token verification. Only `cause()` reaches the client.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("token header has no kid")]
    MissingKid,
    #[error("unexpected algorithm {0:?}")]
    Algorithm(Algorithm),
    #[error(transparent)]
    Keys(#[from] KeyError),
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("issuer '{0}' is not trusted")]
    Issuer(String),
    #[error("audience '{0}' does not match")]
    Audience(String),
    #[error("token expired at {exp}")]
    Expired { exp: i64 },
}

impl VerifyError {
    /// Coarse, client-safe category for the rejection message.
    pub fn cause(&self) -> &'static str {
        match self {
            Self::MissingKid | Self::Algorithm(_) => "malformed",
            Self::Keys(KeyError::UnknownKid(_)) => "signature",
            Self::Keys(_) => "signing keys unavailable",
            Self::Issuer(_) => "bad issuer",
            Self::Audience(_) => "bad audience",
            Self::Expired { .. } => "expired",
            Self::Jwt(e) => match e.kind() {
                ErrorKind::ExpiredSignature => "expired",
                ErrorKind::InvalidAudience => "bad audience",
                ErrorKind::InvalidIssuer => "bad issuer",
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => "signature",
                _ => "malformed",
            },
        }
    }
}

/// What a token must satisfy besides a valid signature.
#[derive(Debug, Clone)]
pub struct IdTokenPolicy {
    pub project: String,
    pub issuer_prefix: String,
    pub clock_skew_seconds: u64,
}

impl IdTokenPolicy {
    pub fn for_project(project: impl Into<String>) -> Self {
        let project = project.into();
        Self {
            issuer_prefix: issuer_prefix_for(&project),
            project,
            clock_skew_seconds: 5,
        }
    }
}

/// RS256 verifier for identity-provider ID tokens.
///
/// - Key material comes from a shared [`SigningKeys`] source.
/// - Stateless per call; safe to share behind an `Arc`.
#[derive(Clone)]
pub struct IdTokenVerifier {
    keys: Arc<dyn SigningKeys>,
    policy: IdTokenPolicy,
    validation: Validation,
}

impl fmt::Debug for IdTokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdTokenVerifier")
            .field("keys", &self.keys.source_name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl IdTokenVerifier {
    pub fn new(keys: Arc<dyn SigningKeys>, policy: IdTokenPolicy) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[policy.project.as_str()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        // exp must not be earlier than now - skew; never extended further.
        validation.leeway = policy.clock_skew_seconds;

        Self {
            keys,
            policy,
            validation,
        }
    }

    /// Verify an `Authorization` header value and return the token's claims.
    pub async fn verify(&self, authorization: Option<&str>) -> Result<IdTokenClaims, AuthError> {
        let token = bearer_token(authorization)
            .ok_or_else(|| AuthError::unauthenticated("missing bearer token"))?;

        self.verify_token(token).await.map_err(|err| {
            tracing::warn!(error = %err, "id token verification failed");
            AuthError::unauthenticated(format!("invalid token: {}", err.cause()))
        })
    }

    /// Signature, issuer, audience and expiry checks for a raw token.
    pub async fn verify_token(&self, token: &str) -> Result<IdTokenClaims, VerifyError> {
        let header = jsonwebtoken::decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::Algorithm(header.alg));
        }
        let kid = header.kid.as_deref().ok_or(VerifyError::MissingKid)?;

        let key = self.keys.decoding_key(kid).await?;
        let claims = jsonwebtoken::decode::<IdTokenClaims>(token, &key, &self.validation)?.claims;

        if !claims.iss.starts_with(&self.policy.issuer_prefix) {
            return Err(VerifyError::Issuer(claims.iss));
        }
        if claims.aud != self.policy.project {
            return Err(VerifyError::Audience(claims.aud));
        }
        let oldest_allowed = chrono::Utc::now().timestamp() - self.policy.clock_skew_seconds as i64;
        if claims.exp < oldest_allowed {
            return Err(VerifyError::Expired { exp: claims.exp });
        }

        Ok(claims)
    }
}

/// Token part of `Bearer <token>`; `None` when absent, another scheme, or empty.
pub fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    authorization?
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
}
