// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Core data types shared by the verification endpoint, the storage
//! repositories, and the client-side auth flow.
//!
//! ## Wallet Address Type
//!
//! The [`WalletAddress`] newtype wraps Ethereum-style addresses (`0x` +
//! 40 hex characters). Parsing validates the grammar and normalizes to
//! lower-case; every address held by this crate is canonical, so equality
//! and storage lookups are plain string comparisons.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;

/// Domain suffix for identifiers derived from wallet addresses.
///
/// The identity provider requires an email-shaped identifier per user;
/// `<address>@<domain>` gives one that is unique exactly when the wallet
/// address is.
pub const DERIVED_EMAIL_DOMAIN: &str = "wallet.walletgate.app";

/// Error returned when a string does not match the wallet address grammar.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid wallet address: expected 0x followed by 40 hex characters")]
pub struct AddressParseError;

/// Ethereum-compatible wallet address, canonically lower-case.
///
/// Construct via [`WalletAddress::parse`]; mixed-case input is accepted
/// and normalized. The inner string always matches `^0x[a-f0-9]{40}$`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and normalize a wallet address.
    ///
    /// Accepts mixed case; rejects anything that is not `0x` + 40 hex
    /// characters.
    pub fn parse(value: &str) -> Result<Self, AddressParseError> {
        let value = value.trim();
        let hex_part = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .ok_or(AddressParseError)?;
        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressParseError);
        }
        Ok(WalletAddress(format!("0x{}", hex_part.to_lowercase())))
    }

    /// The canonical lower-case string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derived email identifier for the identity provider
    /// (`<address>@wallet.walletgate.app`).
    pub fn derived_email(&self) -> String {
        format!("{}@{}", self.0, DERIVED_EMAIL_DOMAIN)
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for WalletAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

/// A backend identity resolved from a wallet address.
///
/// `id` is the provider's opaque user id; `email` is the derived
/// identifier the identity was registered under.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Identity {
    /// Provider-assigned user id.
    pub id: String,
    /// Derived email identifier.
    pub email: String,
}

/// A wallet signature over the fixed challenge message.
///
/// Ephemeral: produced by the signature module, submitted to the
/// verification endpoint, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedChallenge {
    /// The address the client claims to control.
    #[serde(rename = "wallet_address")]
    pub address: WalletAddress,
    /// The message that was signed. Must equal the fixed constant.
    pub message: String,
    /// 65-byte EIP-191 signature, 0x-prefixed hex.
    pub signature: String,
}

/// A user profile row, keyed by wallet address.
///
/// May pre-exist unlinked (`identity_id` absent) before the wallet's first
/// login; linked exactly once. `onboarded` flips false→true only through
/// the explicit onboarding-completion operation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Profile {
    /// Unique profile id (UUID).
    pub id: String,
    /// Linked provider identity, absent until first login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<String>,
    /// The wallet address this profile is bound to (unique).
    pub wallet_address: WalletAddress,
    /// The profile's primary role.
    pub role: Role,
    /// Display name, set during onboarding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Institution, set during onboarding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    /// Whether onboarding has been completed.
    pub onboarded: bool,
    /// When the profile row was created.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// When the profile row was last updated.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Profile {
    /// A fresh profile for a first-time login, linked to `identity_id`.
    ///
    /// Defaults: role `student`, not onboarded.
    pub fn new_linked(wallet_address: WalletAddress, identity_id: &str) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            identity_id: Some(identity_id.to_string()),
            wallet_address,
            role: Role::Student,
            display_name: None,
            institution: None,
            onboarded: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// An unlinked pre-provisioned profile (e.g. admin seeding).
    pub fn new_unlinked(wallet_address: WalletAddress, role: Role) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            identity_id: None,
            wallet_address,
            role,
            display_name: None,
            institution: None,
            onboarded: false,
            created_at: now,
            updated_at: now,
        }
    }
}
