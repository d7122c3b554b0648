// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile repository.
//!
//! One profile per wallet address, stored as
//! `profiles/{wallet_address}.json`. The address-keyed file name is the
//! uniqueness constraint concurrent first logins serialize on.

use crate::models::{Profile, WalletAddress};

use super::super::{FileStorage, StorageError, StorageResult};

/// Repository for profile rows.
pub struct ProfileRepository<'a> {
    storage: &'a FileStorage,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new ProfileRepository.
    pub fn new(storage: &'a FileStorage) -> Self {
        Self { storage }
    }

    /// Check if a profile exists for a wallet address.
    pub fn exists(&self, address: &WalletAddress) -> bool {
        self.storage.exists(self.storage.paths().profile(address))
    }

    /// Get the profile bound to a wallet address.
    pub fn get_by_wallet(&self, address: &WalletAddress) -> StorageResult<Profile> {
        let path = self.storage.paths().profile(address);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Profile for {address}")));
        }
        self.storage.read_json(path)
    }

    /// Get the profile linked to an identity id.
    pub fn get_by_identity(&self, identity_id: &str) -> StorageResult<Profile> {
        let addresses = self
            .storage
            .list_files(self.storage.paths().profiles_dir(), "json")?;

        for stem in addresses {
            if let Ok(address) = WalletAddress::parse(&stem) {
                if let Ok(profile) = self.get_by_wallet(&address) {
                    if profile.identity_id.as_deref() == Some(identity_id) {
                        return Ok(profile);
                    }
                }
            }
        }

        Err(StorageError::NotFound(format!(
            "Profile for identity {identity_id}"
        )))
    }

    /// Insert a new profile.
    ///
    /// Exclusive create: a concurrent insert for the same address fails
    /// with [`StorageError::AlreadyExists`] and must re-resolve as a read.
    pub fn create(&self, profile: &Profile) -> StorageResult<()> {
        self.storage
            .write_json_new(self.storage.paths().profile(&profile.wallet_address), profile)
    }

    /// Update an existing profile.
    pub fn update(&self, profile: &Profile) -> StorageResult<()> {
        let path = self.storage.paths().profile(&profile.wallet_address);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!(
                "Profile for {}",
                profile.wallet_address
            )));
        }
        self.storage.write_json(path, profile)
    }

    /// Link a pre-provisioned profile to its identity.
    ///
    /// No-op if the profile is already linked to `identity_id`.
    pub fn link_identity(
        &self,
        address: &WalletAddress,
        identity_id: &str,
    ) -> StorageResult<Profile> {
        let mut profile = self.get_by_wallet(address)?;
        if profile.identity_id.as_deref() != Some(identity_id) {
            profile.identity_id = Some(identity_id.to_string());
            profile.updated_at = chrono::Utc::now();
            self.update(&profile)?;
        }
        Ok(profile)
    }

    /// Mark the profile linked to `identity_id` as onboarded.
    ///
    /// Idempotent: calling it when already onboarded changes nothing and
    /// returns the profile unchanged.
    pub fn set_onboarded(&self, identity_id: &str) -> StorageResult<Profile> {
        let mut profile = self.get_by_identity(identity_id)?;
        if !profile.onboarded {
            profile.onboarded = true;
            profile.updated_at = chrono::Utc::now();
            self.update(&profile)?;
        }
        Ok(profile)
    }
}
