// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication flow errors.

/// The single user-facing string for every verification failure.
///
/// Message mismatch, malformed signature, and address mismatch all
/// collapse to this; distinguishing them would hand an oracle to anyone
/// probing the verification logic.
pub const VERIFICATION_FAILED_MESSAGE: &str =
    "Wallet verification failed. Please reconnect your wallet and try again.";

/// Typed failures of the wallet authentication flow.
///
/// These are the only errors the flow surfaces to callers. None of them
/// crash the client state machine; it always returns to a well-defined
/// state.
#[derive(Debug, thiserror::Error)]
pub enum AuthFlowError {
    /// No wallet capability is present.
    #[error("no wallet extension is available")]
    WalletUnavailable,

    /// Signer/address mismatch, missing active address, or session
    /// redemption failure.
    #[error("wallet authentication failed")]
    AuthenticationFailed,

    /// Server-side signature/message rejection.
    #[error("wallet verification failed")]
    VerificationFailed,

    /// Storage or provider failure during identity creation.
    #[error("identity provisioning failed: {0}")]
    ProvisioningFailed(String),

    /// Profile read failure. Non-fatal: callers treat it as "no profile"
    /// so onboarding is (re)triggered instead of the app getting stuck.
    #[error("profile fetch failed: {0}")]
    ProfileFetchFailed(String),
}
