// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role assignment repository.
//!
//! A role assignment is a `(identity_id, role)` pair stored as
//! `user_roles/{identity_id}__{role}.json`. An identity may hold several
//! assignments; insertion is idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

use super::super::{FileStorage, StorageError, StorageResult};

/// A stored role assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRoleAssignment {
    /// The identity this role is granted to.
    pub identity_id: String,
    /// The granted role.
    pub role: Role,
    /// When the assignment was created.
    pub granted_at: DateTime<Utc>,
}

/// Repository for role assignments.
pub struct RoleRepository<'a> {
    storage: &'a FileStorage,
}

impl<'a> RoleRepository<'a> {
    /// Create a new RoleRepository.
    pub fn new(storage: &'a FileStorage) -> Self {
        Self { storage }
    }

    /// Ensure a role assignment exists.
    ///
    /// Idempotent: a duplicate `(identity_id, role)` pair is a no-op, not
    /// an error, including when a concurrent writer inserts it first.
    pub fn ensure(&self, identity_id: &str, role: Role) -> StorageResult<()> {
        let assignment = StoredRoleAssignment {
            identity_id: identity_id.to_string(),
            role,
            granted_at: Utc::now(),
        };
        let path = self.storage.paths().role_assignment(identity_id, role);
        match self.storage.write_json_new(path, &assignment) {
            Ok(()) | Err(StorageError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// List all roles assigned to an identity.
    pub fn list_for_identity(&self, identity_id: &str) -> StorageResult<Vec<Role>> {
        let stems = self
            .storage
            .list_files(self.storage.paths().user_roles_dir(), "json")?;

        let prefix = format!("{identity_id}__");
        let mut roles = Vec::new();
        for stem in stems {
            if !stem.starts_with(&prefix) {
                continue;
            }
            let assignment: StoredRoleAssignment = self
                .storage
                .read_json(self.storage.paths().user_roles_dir().join(format!("{stem}.json")))?;
            if assignment.identity_id == identity_id {
                roles.push(assignment.role);
            }
        }
        Ok(roles)
    }
}
