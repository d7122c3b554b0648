// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-message challenge verification.
//!
//! The client signs [`CHALLENGE_MESSAGE`] with its wallet key using
//! EIP-191 personal-message signing; the server recovers the signing
//! address from the signature and compares it to the submitted address.
//!
//! The message is a process-wide constant shared byte-for-byte with the
//! client. It carries no nonce or timestamp, so a captured
//! `(address, signature)` pair remains replayable; the signature proves
//! key possession, not freshness. Changing the constant invalidates no
//! stored state (signatures are never persisted) but requires a
//! simultaneous client/server deployment.

use alloy::hex;
use alloy::primitives::Signature;

use crate::models::WalletAddress;

/// The fixed challenge message, identical on client and server.
pub const CHALLENGE_MESSAGE: &str =
    "Sign this message to verify you own this wallet and sign in to Walletgate.";

/// Internal verification failure. Logged server-side, never returned to
/// clients (all variants map to the one generic 401 string).
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("challenge message does not match the fixed constant")]
    MessageMismatch,

    #[error("signature is malformed: {0}")]
    MalformedSignature(String),

    #[error("address recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("recovered address {recovered} does not match submitted address {submitted}")]
    AddressMismatch { recovered: String, submitted: String },
}

/// Verify a signed challenge against a submitted wallet address.
///
/// `address` must already be canonical (parsed through
/// [`WalletAddress::parse`]); `signature_hex` is the 65-byte EIP-191
/// signature as 0x-prefixed hex.
///
/// Checks, in order: message equality with the fixed constant, signature
/// decode, address recovery, recovered-vs-submitted comparison.
pub fn verify_signed_challenge(
    address: &WalletAddress,
    message: &str,
    signature_hex: &str,
) -> Result<(), ChallengeError> {
    if message != CHALLENGE_MESSAGE {
        return Err(ChallengeError::MessageMismatch);
    }

    let raw = hex::decode(signature_hex.trim().trim_start_matches("0x"))
        .map_err(|e| ChallengeError::MalformedSignature(e.to_string()))?;
    let signature =
        Signature::from_raw(&raw).map_err(|e| ChallengeError::MalformedSignature(e.to_string()))?;

    let recovered = signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| ChallengeError::RecoveryFailed(e.to_string()))?;

    let recovered = format!("0x{}", hex::encode(recovered));
    if recovered != address.as_str() {
        return Err(ChallengeError::AddressMismatch {
            recovered,
            submitted: address.to_string(),
        });
    }

    Ok(())
}
