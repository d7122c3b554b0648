// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Provider Module
//!
//! The hosted identity provider is consumed as an opaque service: user
//! records, one-time magic-link credentials, and sessions live there.
//! This crate only ever asks it to create/fetch users, mint a one-time
//! link, redeem one, and sign out.
//!
//! Two implementations:
//!
//! - [`HttpIdentityProvider`] - production client against the provider's
//!   admin REST surface, authenticated with a service-role key
//! - [`MemoryIdentityProvider`] - in-process implementation with the same
//!   contract (email uniqueness, single-redemption tokens), used in
//!   development mode and tests

pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use http::HttpIdentityProvider;
pub use memory::MemoryIdentityProvider;

use crate::models::WalletAddress;

/// Error type for identity provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A user with this email already exists (uniqueness race).
    #[error("a user with this email already exists")]
    EmailTaken,

    /// User not found.
    #[error("user not found: {0}")]
    NotFound(String),

    /// One-time token missing, expired, or already redeemed.
    #[error("one-time credential is invalid or already redeemed")]
    InvalidToken,

    /// Provider configuration missing.
    #[error("provider configuration missing: {0}")]
    MissingConfig(String),

    /// Transport-level failure.
    #[error("provider request failed: {0}")]
    Request(String),

    /// Provider returned an unexpected payload.
    #[error("provider response was invalid: {0}")]
    InvalidResponse(String),
}

/// A user record owned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderUser {
    /// Provider-assigned opaque id.
    pub id: String,
    /// Email identifier (derived from the wallet address).
    pub email: String,
    /// Whether the email is confirmed. Wallet users are created
    /// pre-confirmed; no confirmation mail is ever sent.
    pub email_confirmed: bool,
    /// Wallet address carried as provider-level metadata, so the address
    /// survives even if the profile row is lost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<WalletAddress>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// Request to create a provider user.
#[derive(Debug, Clone)]
pub struct NewProviderUser {
    pub email: String,
    pub wallet_address: WalletAddress,
}

/// A minted one-time session credential (magic link).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SessionCredential {
    /// Hashed one-time token; the client redeems this.
    pub token_hash: String,
    /// Full redemption URL for link-based flows.
    pub verification_url: String,
}

/// A live session established by redeeming a one-time credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    /// Opaque access token identifying the session.
    pub access_token: String,
    /// The user the session belongs to.
    pub user: ProviderUser,
}

/// The identity provider surface this crate consumes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a user, pre-confirmed, with the wallet address as metadata.
    ///
    /// Fails with [`ProviderError::EmailTaken`] if the email is already
    /// registered; callers treat that as losing a concurrent-creation
    /// race and re-resolve by email.
    async fn create_user(&self, new_user: NewProviderUser) -> Result<ProviderUser, ProviderError>;

    /// Fetch a user by id.
    async fn get_user(&self, user_id: &str) -> Result<ProviderUser, ProviderError>;

    /// Fetch a user by email.
    async fn get_user_by_email(&self, email: &str) -> Result<ProviderUser, ProviderError>;

    /// Mint a one-time magic-link credential for a user's email.
    async fn generate_magic_link(&self, email: &str) -> Result<SessionCredential, ProviderError>;

    /// Redeem a one-time credential into a live session.
    ///
    /// Single redemption: a second redeem of the same token fails with
    /// [`ProviderError::InvalidToken`].
    async fn redeem_magic_link(&self, token_hash: &str)
        -> Result<ProviderSession, ProviderError>;

    /// Destroy the session behind an access token.
    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;

    /// Check provider reachability.
    async fn health(&self) -> Result<(), ProviderError>;
}
