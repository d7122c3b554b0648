// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles on the credential platform.
///
/// Roles are a closed set; authorization checks are membership tests
/// against an identity's role assignments, with no privilege hierarchy.
///
/// - `Student` - Holds credentials, requests issuance
/// - `Issuer` - Issues credentials to students
/// - `Verifier` - Verifies presented credentials
/// - `Admin` - Platform administration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Credential holder
    Student,
    /// Credential issuer
    Issuer,
    /// Credential verifier
    Verifier,
    /// Platform administrator
    Admin,
}

impl Role {
    /// Parse a role from its string tag (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "student" => Some(Role::Student),
            "issuer" => Some(Role::Issuer),
            "verifier" => Some(Role::Verifier),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role for a freshly provisioned profile.
    fn default() -> Self {
        Role::Student
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Issuer => write!(f, "issuer"),
            Role::Verifier => write!(f, "verifier"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_parses_correctly() {
        assert_eq!(Role::from_str("student"), Some(Role::Student));
        assert_eq!(Role::from_str("STUDENT"), Some(Role::Student));
        assert_eq!(Role::from_str("Issuer"), Some(Role::Issuer));
        assert_eq!(Role::from_str("verifier"), Some(Role::Verifier));
        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("unknown"), None);
    }

    #[test]
    fn default_role_is_student() {
        assert_eq!(Role::default(), Role::Student);
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for role in [Role::Student, Role::Issuer, Role::Verifier, Role::Admin] {
            assert_eq!(Role::from_str(&role.to_string()), Some(role));
        }
    }

    #[test]
    fn serde_uses_lowercase_tags() {
        assert_eq!(serde_json::to_string(&Role::Issuer).unwrap(), "\"issuer\"");
        let parsed: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(parsed, Role::Admin);
    }
}
