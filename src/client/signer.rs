// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature module: obtaining a challenge signature from the wallet.
//!
//! [`sign_challenge`] talks to whatever wallet capability is present
//! through the [`WalletExtension`] trait and guards against the user
//! switching wallet accounts between "connect" and "sign".

use alloy::hex;
use alloy::signers::{local::PrivateKeySigner, Signer};
use async_trait::async_trait;

use crate::auth::{AuthFlowError, CHALLENGE_MESSAGE};
use crate::models::{SignedChallenge, WalletAddress};

/// A user-controlled wallet capability (browser extension or local key).
#[async_trait]
pub trait WalletExtension: Send + Sync {
    /// The currently active account, if the user has one selected.
    async fn active_address(&self) -> Option<String>;

    /// Sign a message with the active account (EIP-191 personal sign).
    /// Returns the 65-byte signature as 0x-prefixed hex.
    async fn sign_message(&self, message: &str) -> Result<String, AuthFlowError>;
}

/// Obtain a signature over the fixed challenge message.
///
/// `connected_address` is the address the application currently shows as
/// connected. Fails with:
/// - [`AuthFlowError::WalletUnavailable`] when no capability is present
/// - [`AuthFlowError::AuthenticationFailed`] when the extension reports
///   no active address, or its active address differs from
///   `connected_address` (the user switched accounts mid-flow)
///
/// No retry logic here; the caller decides whether to restart the
/// gesture.
pub async fn sign_challenge(
    extension: Option<&dyn WalletExtension>,
    connected_address: &WalletAddress,
) -> Result<SignedChallenge, AuthFlowError> {
    let extension = extension.ok_or(AuthFlowError::WalletUnavailable)?;

    let active = extension
        .active_address()
        .await
        .ok_or(AuthFlowError::AuthenticationFailed)?;
    let active =
        WalletAddress::parse(&active).map_err(|_| AuthFlowError::AuthenticationFailed)?;

    if active != *connected_address {
        return Err(AuthFlowError::AuthenticationFailed);
    }

    let signature = extension.sign_message(CHALLENGE_MESSAGE).await?;

    Ok(SignedChallenge {
        address: active,
        message: CHALLENGE_MESSAGE.to_string(),
        signature,
    })
}

/// Wallet capability backed by a local private key.
///
/// Stands in for a browser wallet in tests and the development binary.
pub struct LocalKeyWallet {
    signer: PrivateKeySigner,
}

impl LocalKeyWallet {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// A wallet with a freshly generated key.
    pub fn random() -> Self {
        Self::new(PrivateKeySigner::random())
    }

    /// The wallet's address in canonical form.
    pub fn address(&self) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}", hex::encode(self.signer.address())))
            .expect("signer address is always well-formed")
    }
}

impl std::fmt::Debug for LocalKeyWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the private key in debug output
        f.debug_struct("LocalKeyWallet")
            .field("address", &self.address())
            .finish()
    }
}

#[async_trait]
impl WalletExtension for LocalKeyWallet {
    async fn active_address(&self) -> Option<String> {
        Some(self.address().to_string())
    }

    async fn sign_message(&self, message: &str) -> Result<String, AuthFlowError> {
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|_| AuthFlowError::AuthenticationFailed)?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}
