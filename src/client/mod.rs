// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Client Auth Module
//!
//! The client side of the wallet authentication protocol: the signature
//! module ([`signer`]) and the auth/onboarding state machine
//! ([`coordinator`]).
//!
//! The coordinator consumes two collaborator seams:
//!
//! - [`SessionGateway`] - the provider's session surface (restore, redeem
//!   one-time credential, sign out)
//! - [`DirectoryClient`] - profile and role reads plus the
//!   onboarding-completion write
//!
//! [`local`] provides in-process implementations of both, backed by the
//! storage repositories and an [`IdentityProvider`], used by the
//! development binary and the test suite.
//!
//! [`IdentityProvider`]: crate::providers::IdentityProvider

pub mod coordinator;
pub mod local;
pub mod signer;

use async_trait::async_trait;

use crate::auth::{AuthFlowError, Role};
use crate::models::{Identity, Profile};

pub use coordinator::{AuthCoordinator, AuthSnapshot, AuthState};
pub use local::{InProcessDirectory, ProviderSessionGateway};
pub use signer::{sign_challenge, LocalKeyWallet, WalletExtension};

/// A live session as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// The identity the session belongs to.
    pub identity: Identity,
    /// Opaque access token for the provider session.
    pub access_token: String,
}

/// Error type for directory reads/writes.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory read failed: {0}")]
    Read(String),

    #[error("directory update failed: {0}")]
    Update(String),
}

/// Profile and role directory, scoped to the authenticated identity.
///
/// Row-level authorization is the store's concern; this seam only carries
/// the operations the state machine needs.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Fetch the profile linked to an identity, `None` if absent.
    async fn fetch_profile(&self, identity_id: &str) -> Result<Option<Profile>, DirectoryError>;

    /// Fetch the full role-assignment set for an identity.
    async fn fetch_roles(&self, identity_id: &str) -> Result<Vec<Role>, DirectoryError>;

    /// Mark the identity's profile as onboarded. Idempotent.
    async fn complete_onboarding(&self, identity_id: &str) -> Result<(), DirectoryError>;
}

/// The provider's session surface as seen by the client.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// The session restored from a previous visit, if any.
    async fn current_session(&self) -> Option<SessionIdentity>;

    /// Redeem a one-time credential into a live session.
    async fn redeem(&self, token_hash: &str) -> Result<SessionIdentity, AuthFlowError>;

    /// Destroy the current session.
    async fn sign_out(&self) -> Result<(), AuthFlowError>;
}
