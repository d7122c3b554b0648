// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed repositories over [`FileStorage`](super::FileStorage).

pub mod profiles;
pub mod roles;

pub use profiles::ProfileRepository;
pub use roles::{RoleRepository, StoredRoleAssignment};
