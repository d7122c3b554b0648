// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Profile & Role Storage Module
//!
//! JSON-file persistence for profile rows and role assignments, under the
//! directory given by `DATA_DIR`.
//!
//! ## Storage Layout
//!
//! ```text
//! <data>/
//!   profiles/
//!     {wallet_address}.json      # One profile per wallet address
//!   user_roles/
//!     {identity_id}__{role}.json # One file per role assignment
//! ```
//!
//! ## Uniqueness
//!
//! Profile files are created with exclusive-create semantics
//! ([`FileStorage::write_json_new`]): of two concurrent first logins for
//! the same address, exactly one insert succeeds and the loser observes
//! [`StorageError::AlreadyExists`] and re-resolves as a read. The file
//! name being the wallet address is the uniqueness constraint.

pub mod json_fs;
pub mod paths;
pub mod repository;

pub use json_fs::{FileStorage, StorageError, StorageResult};
pub use paths::StoragePaths;
pub use repository::{ProfileRepository, RoleRepository, StoredRoleAssignment};
