// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the storage layout.

use std::path::{Path, PathBuf};

use crate::auth::Role;
use crate::models::WalletAddress;

/// Default base directory for persistent storage.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all persistent data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Profile Paths ==========

    /// Directory containing all profiles.
    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join("profiles")
    }

    /// Path to a profile file. The wallet address is canonical lower-case,
    /// so the file name doubles as the uniqueness constraint.
    pub fn profile(&self, address: &WalletAddress) -> PathBuf {
        self.profiles_dir().join(format!("{address}.json"))
    }

    // ========== Role Assignment Paths ==========

    /// Directory containing all role assignments.
    pub fn user_roles_dir(&self) -> PathBuf {
        self.root.join("user_roles")
    }

    /// Path to a role assignment file, one per `(identity_id, role)` pair.
    pub fn role_assignment(&self, identity_id: &str, role: Role) -> PathBuf {
        self.user_roles_dir()
            .join(format!("{identity_id}__{role}.json"))
    }
}
