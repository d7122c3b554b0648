// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Authentication Module
//!
//! Server-side verification of wallet challenge signatures.
//!
//! ## Auth Flow
//!
//! 1. Client signs the fixed [`challenge::CHALLENGE_MESSAGE`] with its
//!    wallet key (EIP-191 personal sign)
//! 2. Client POSTs `{wallet_address, signature, message}` to
//!    `/v1/auth/verify`
//! 3. Server:
//!    - Validates the address grammar
//!    - Checks the message is byte-identical to the fixed constant
//!    - Recovers the signing address from the signature
//!    - Rejects on any mismatch with one generic error string
//! 4. On success, the identity is resolved/provisioned and a one-time
//!    magic link is minted for session bootstrap
//!
//! ## Security
//!
//! - Verification failures never surface the technical cause to the
//!   client; the detailed reason is logged server-side only
//! - The challenge message carries no nonce, so a captured signature is
//!   replayable; see the module docs in [`challenge`]

pub mod challenge;
pub mod error;
pub mod roles;

pub use challenge::{verify_signed_challenge, ChallengeError, CHALLENGE_MESSAGE};
pub use error::{AuthFlowError, VERIFICATION_FAILED_MESSAGE};
pub use roles::Role;
