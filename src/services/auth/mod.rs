pub mod error;
pub mod factory;
pub mod gate;
pub mod id_token;
pub mod identity;
pub mod keys;
pub mod resolver;
pub mod role;

pub use error::AuthError;
pub use factory::build_auth_gate;
pub use gate::AuthGate;
pub use id_token::{IdTokenClaims, IdTokenPolicy, IdTokenVerifier};
pub use identity::IdentityContext;
pub use resolver::RoleResolver;
pub use role::Role;
