// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process collaborator implementations.
//!
//! [`InProcessDirectory`] serves the coordinator's profile/role reads and
//! the onboarding write straight from the storage repositories;
//! [`ProviderSessionGateway`] adapts an [`IdentityProvider`] to the
//! client's session seam. Used by the development binary and the test
//! suite; a browser deployment would substitute HTTP-backed
//! implementations of the same traits.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::auth::{AuthFlowError, Role};
use crate::models::{Identity, Profile};
use crate::providers::IdentityProvider;
use crate::storage::{FileStorage, ProfileRepository, RoleRepository, StorageError};

use super::{DirectoryClient, DirectoryError, SessionGateway, SessionIdentity};

/// Directory reads/writes against local storage repositories.
pub struct InProcessDirectory {
    storage: FileStorage,
}

impl InProcessDirectory {
    pub fn new(storage: FileStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl DirectoryClient for InProcessDirectory {
    async fn fetch_profile(&self, identity_id: &str) -> Result<Option<Profile>, DirectoryError> {
        match ProfileRepository::new(&self.storage).get_by_identity(identity_id) {
            Ok(profile) => Ok(Some(profile)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(DirectoryError::Read(e.to_string())),
        }
    }

    async fn fetch_roles(&self, identity_id: &str) -> Result<Vec<Role>, DirectoryError> {
        RoleRepository::new(&self.storage)
            .list_for_identity(identity_id)
            .map_err(|e| DirectoryError::Read(e.to_string()))
    }

    async fn complete_onboarding(&self, identity_id: &str) -> Result<(), DirectoryError> {
        ProfileRepository::new(&self.storage)
            .set_onboarded(identity_id)
            .map(|_| ())
            .map_err(|e| DirectoryError::Update(e.to_string()))
    }
}

/// Session gateway backed by an identity provider.
///
/// Holds the client's view of the current session; redemption and
/// sign-out go through the provider.
pub struct ProviderSessionGateway {
    provider: Arc<dyn IdentityProvider>,
    current: RwLock<Option<SessionIdentity>>,
}

impl ProviderSessionGateway {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            current: RwLock::new(None),
        }
    }
}

#[async_trait]
impl SessionGateway for ProviderSessionGateway {
    async fn current_session(&self) -> Option<SessionIdentity> {
        self.current.read().await.clone()
    }

    async fn redeem(&self, token_hash: &str) -> Result<SessionIdentity, AuthFlowError> {
        let session = self
            .provider
            .redeem_magic_link(token_hash)
            .await
            .map_err(|_| AuthFlowError::AuthenticationFailed)?;

        let session = SessionIdentity {
            identity: Identity {
                id: session.user.id,
                email: session.user.email,
            },
            access_token: session.access_token,
        };
        *self.current.write().await = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthFlowError> {
        // Drop the local session first: it must be gone even if the
        // provider call below fails.
        let session = self.current.write().await.take();
        if let Some(session) = session {
            self.provider
                .sign_out(&session.access_token)
                .await
                .map_err(|e| {
                    tracing::warn!(error = %e, "provider sign-out failed");
                    AuthFlowError::AuthenticationFailed
                })?;
        }
        Ok(())
    }
}
