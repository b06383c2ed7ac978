//! Authorization roles and their fixed ordering.
use std::{fmt, str::FromStr};

use serde::Serialize;

/// A caller's authorization level.
///
/// Variants are declared in rank order, so the derived `Ord` is the
/// "at least as privileged as" relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Loader,
    Supervisor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Viewer, Role::Loader, Role::Supervisor, Role::Admin];

    pub fn rank(self) -> u8 {
        match self {
            Role::Viewer => 0,
            Role::Loader => 1,
            Role::Supervisor => 2,
            Role::Admin => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Loader => "loader",
            Role::Supervisor => "supervisor",
            Role::Admin => "admin",
        }
    }

    /// `true` when `self` grants at least the access of `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    // Case-insensitive; anything outside the four names is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "loader" => Ok(Role::Loader),
            "supervisor" => Ok(Role::Supervisor),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_fixed_and_strictly_increasing() {
        let ranks: Vec<u8> = Role::ALL.iter().map(|r| r.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        for pair in Role::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("Supervisor".parse::<Role>(), Ok(Role::Supervisor));
        assert_eq!("loader".parse::<Role>(), Ok(Role::Loader));
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert!("owner".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
        assert!(" viewer".parse::<Role>().is_err());
    }

    #[test]
    fn satisfies_follows_rank() {
        for held in Role::ALL {
            for required in Role::ALL {
                assert_eq!(held.satisfies(required), held.rank() >= required.rank());
            }
        }
    }

    #[test]
    fn display_and_serialize_are_lower_case() {
        assert_eq!(Role::Supervisor.to_string(), "supervisor");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
