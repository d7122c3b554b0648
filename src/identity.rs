// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity resolution, provisioning, and session bootstrap.
//!
//! Given a verified wallet address, [`resolve_or_create_identity`] finds
//! or creates exactly one provider identity and one profile row bound to
//! that address. There is no application-level locking: the storage
//! layer's exclusive profile create and the provider's email uniqueness
//! are the serialization points, and losers of either race re-resolve as
//! a read.

use crate::auth::Role;
use crate::models::{Identity, Profile, WalletAddress};
use crate::providers::{
    IdentityProvider, NewProviderUser, ProviderError, ProviderUser, SessionCredential,
};
use crate::storage::{FileStorage, ProfileRepository, RoleRepository, StorageError};

/// Error type for identity resolution.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<&ProviderUser> for Identity {
    fn from(user: &ProviderUser) -> Self {
        Identity {
            id: user.id.clone(),
            email: user.email.clone(),
        }
    }
}

/// Resolve the identity bound to a wallet address, creating it on first
/// login.
///
/// - Profile exists and is linked: fetch and return that identity, no
///   mutation.
/// - Profile unlinked or absent: create the provider user (derived email,
///   pre-confirmed, wallet address in metadata), link the existing
///   profile in place or insert a fresh `student` profile, and ensure the
///   `student` role assignment.
///
/// Two concurrent calls for the same brand-new address converge on one
/// identity: the losing writer's uniqueness violation (storage or
/// provider) is caught and resolved as a read.
pub async fn resolve_or_create_identity(
    storage: &FileStorage,
    provider: &dyn IdentityProvider,
    address: &WalletAddress,
) -> Result<Identity, ProvisioningError> {
    if let Some(identity) = resolve_linked(storage, provider, address).await? {
        return Ok(identity);
    }

    match provision(storage, provider, address).await {
        Ok(identity) => Ok(identity),
        Err(ProvisioningError::Storage(StorageError::AlreadyExists(_))) => {
            // Lost the profile-insert race; the winner's row is
            // authoritative now.
            tracing::debug!(%address, "profile insert raced, re-resolving");
            resolve_linked(storage, provider, address)
                .await?
                .ok_or_else(|| {
                    ProvisioningError::Storage(StorageError::NotFound(format!(
                        "profile for {address} vanished during re-resolution"
                    )))
                })
        }
        Err(e) => Err(e),
    }
}

/// Case A: return the identity a linked profile points at, if any.
async fn resolve_linked(
    storage: &FileStorage,
    provider: &dyn IdentityProvider,
    address: &WalletAddress,
) -> Result<Option<Identity>, ProvisioningError> {
    let profiles = ProfileRepository::new(storage);
    match profiles.get_by_wallet(address) {
        Ok(profile) => match profile.identity_id {
            Some(identity_id) => {
                let user = provider.get_user(&identity_id).await?;
                Ok(Some(Identity::from(&user)))
            }
            None => Ok(None),
        },
        Err(StorageError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Case B: create the provider user and bind a profile to it.
async fn provision(
    storage: &FileStorage,
    provider: &dyn IdentityProvider,
    address: &WalletAddress,
) -> Result<Identity, ProvisioningError> {
    let email = address.derived_email();

    let user = match provider
        .create_user(NewProviderUser {
            email: email.clone(),
            wallet_address: address.clone(),
        })
        .await
    {
        Ok(user) => user,
        Err(ProviderError::EmailTaken) => {
            // A concurrent login created the user first; adopt it.
            tracing::debug!(%address, "identity creation raced, adopting existing user");
            provider.get_user_by_email(&email).await?
        }
        Err(e) => return Err(e.into()),
    };

    let profiles = ProfileRepository::new(storage);
    match profiles.get_by_wallet(address) {
        Ok(_) => {
            // Pre-provisioned, unlinked profile: attach the identity in
            // place, keeping its role and onboarding state.
            profiles.link_identity(address, &user.id)?;
        }
        Err(StorageError::NotFound(_)) => {
            profiles.create(&Profile::new_linked(address.clone(), &user.id))?;
        }
        Err(e) => return Err(e.into()),
    }

    RoleRepository::new(storage).ensure(&user.id, Role::Student)?;

    tracing::info!(%address, identity_id = %user.id, "provisioned identity for wallet");
    Ok(Identity::from(&user))
}

/// Mint a one-time session credential for a resolved identity.
///
/// The credential is returned to the caller, never redeemed server-side;
/// the client redeems it against the provider to obtain a live session.
pub async fn issue_session_credential(
    provider: &dyn IdentityProvider,
    identity: &Identity,
) -> Result<SessionCredential, ProviderError> {
    provider.generate_magic_link(&identity.email).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryIdentityProvider;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn test_storage() -> (FileStorage, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let mut storage = FileStorage::new(StoragePaths::new(dir.path()));
        storage.initialize().expect("initialize");
        (storage, dir)
    }

    fn addr(n: u8) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}{:02x}", "12".repeat(19), n)).unwrap()
    }

    #[tokio::test]
    async fn first_login_provisions_identity_profile_and_role() {
        let (storage, _dir) = test_storage();
        let provider = MemoryIdentityProvider::new("http://localhost:3000");

        let identity = resolve_or_create_identity(&storage, &provider, &addr(1))
            .await
            .unwrap();
        assert_eq!(identity.email, addr(1).derived_email());

        let profile = ProfileRepository::new(&storage)
            .get_by_wallet(&addr(1))
            .unwrap();
        assert_eq!(profile.identity_id.as_deref(), Some(identity.id.as_str()));
        assert_eq!(profile.role, Role::Student);
        assert!(!profile.onboarded);

        let roles = RoleRepository::new(&storage)
            .list_for_identity(&identity.id)
            .unwrap();
        assert_eq!(roles, vec![Role::Student]);
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let (storage, _dir) = test_storage();
        let provider = MemoryIdentityProvider::new("http://localhost:3000");

        let first = resolve_or_create_identity(&storage, &provider, &addr(2))
            .await
            .unwrap();
        let second = resolve_or_create_identity(&storage, &provider, &addr(2))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(provider.user_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_first_logins_converge_on_one_identity() {
        let (storage, _dir) = test_storage();
        let provider = MemoryIdentityProvider::new("http://localhost:3000");

        let addr3 = addr(3);
        let (a, b) = tokio::join!(
            resolve_or_create_identity(&storage, &provider, &addr3),
            resolve_or_create_identity(&storage, &provider, &addr3),
        );

        // Neither call surfaces an error and both see the same identity.
        let a = a.unwrap();
        let b = b.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(provider.user_count().await, 1);

        let profile = ProfileRepository::new(&storage)
            .get_by_wallet(&addr(3))
            .unwrap();
        assert_eq!(profile.identity_id.as_deref(), Some(a.id.as_str()));
    }

    #[tokio::test]
    async fn unlinked_profile_is_linked_in_place() {
        let (storage, _dir) = test_storage();
        let provider = MemoryIdentityProvider::new("http://localhost:3000");

        // Pre-provisioned admin profile from seeding.
        let seeded = Profile::new_unlinked(addr(4), Role::Admin);
        ProfileRepository::new(&storage).create(&seeded).unwrap();

        let identity = resolve_or_create_identity(&storage, &provider, &addr(4))
            .await
            .unwrap();

        let profile = ProfileRepository::new(&storage)
            .get_by_wallet(&addr(4))
            .unwrap();
        assert_eq!(profile.id, seeded.id);
        assert_eq!(profile.identity_id.as_deref(), Some(identity.id.as_str()));
        // The seeded role survives linking; the student assignment is
        // additive at the role-set level.
        assert_eq!(profile.role, Role::Admin);
    }

    #[tokio::test]
    async fn provider_race_is_adopted_not_errored() {
        let (storage, _dir) = test_storage();
        let provider = MemoryIdentityProvider::new("http://localhost:3000");

        // Simulate a winner that created the provider user but whose
        // profile write we did not observe yet.
        let existing = provider
            .create_user(NewProviderUser {
                email: addr(5).derived_email(),
                wallet_address: addr(5),
            })
            .await
            .unwrap();

        let identity = resolve_or_create_identity(&storage, &provider, &addr(5))
            .await
            .unwrap();
        assert_eq!(identity.id, existing.id);
        assert_eq!(provider.user_count().await, 1);
    }

    #[tokio::test]
    async fn session_credential_is_minted_for_the_identity_email() {
        let (storage, _dir) = test_storage();
        let provider = MemoryIdentityProvider::new("http://localhost:3000");

        let identity = resolve_or_create_identity(&storage, &provider, &addr(6))
            .await
            .unwrap();
        let credential = issue_session_credential(&provider, &identity).await.unwrap();

        let session = provider.redeem_magic_link(&credential.token_hash).await.unwrap();
        assert_eq!(session.user.email, identity.email);
    }
}
