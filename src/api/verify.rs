// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet verification endpoint.
//!
//! Stateless: validate the submitted `(address, signature, message)`
//! triple, resolve or provision the identity behind the address, mint a
//! one-time session credential, and hand everything back to the client.
//!
//! Every verification rejection maps to the same 401 body regardless of
//! cause; the detail goes to the log only.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{verify_signed_challenge, VERIFICATION_FAILED_MESSAGE};
use crate::error::ApiError;
use crate::identity::{issue_session_credential, resolve_or_create_identity};
use crate::models::WalletAddress;
use crate::state::AppState;

/// Request body for POST /v1/auth/verify.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyWalletRequest {
    /// Wallet address, mixed case accepted.
    pub wallet_address: String,
    /// 65-byte EIP-191 signature, 0x-prefixed hex.
    pub signature: String,
    /// The challenge message that was signed.
    pub message: String,
}

/// The authenticated user in a verification response.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifiedUser {
    /// Provider identity id.
    pub id: String,
    /// Derived email identifier.
    pub email: String,
    /// Canonical (lower-case) wallet address.
    pub wallet_address: WalletAddress,
}

/// Response body for a successful verification.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyWalletResponse {
    pub success: bool,
    pub user: VerifiedUser,
    /// One-time token for session redemption.
    pub token_hash: String,
    /// Full magic-link URL for link-based redemption.
    pub verification_url: String,
}

/// Verify a wallet challenge signature and bootstrap a session.
#[utoipa::path(
    post,
    path = "/v1/auth/verify",
    tag = "Auth",
    request_body = VerifyWalletRequest,
    responses(
        (status = 200, description = "Signature verified, session credential issued", body = VerifyWalletResponse),
        (status = 400, description = "Malformed wallet address or missing fields"),
        (status = 401, description = "Signature, message, or address rejected"),
        (status = 500, description = "Storage or provider failure"),
    )
)]
pub async fn verify_wallet(
    State(state): State<AppState>,
    Json(request): Json<VerifyWalletRequest>,
) -> Result<Json<VerifyWalletResponse>, ApiError> {
    let address = WalletAddress::parse(&request.wallet_address)
        .map_err(|_| ApiError::bad_request("Invalid wallet address format"))?;

    if let Err(cause) = verify_signed_challenge(&address, &request.message, &request.signature) {
        // Log the real cause; the client sees one generic string for
        // every rejection.
        tracing::warn!(%address, %cause, "wallet verification rejected");
        return Err(ApiError::unauthorized(VERIFICATION_FAILED_MESSAGE));
    }

    let identity = resolve_or_create_identity(&state.storage, state.provider.as_ref(), &address)
        .await
        .map_err(|e| {
            tracing::error!(%address, error = %e, "identity resolution failed");
            ApiError::internal("Failed to resolve identity for wallet")
        })?;

    let credential = issue_session_credential(state.provider.as_ref(), &identity)
        .await
        .map_err(|e| {
            tracing::error!(%address, error = %e, "session credential issuance failed");
            ApiError::internal("Failed to issue session credential")
        })?;

    Ok(Json(VerifyWalletResponse {
        success: true,
        user: VerifiedUser {
            id: identity.id,
            email: identity.email,
            wallet_address: address,
        },
        token_hash: credential.token_hash,
        verification_url: credential.verification_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CHALLENGE_MESSAGE;
    use crate::client::{sign_challenge, LocalKeyWallet};
    use crate::state::test_support::test_state;
    use axum::http::StatusCode;

    async fn signed_request(wallet: &LocalKeyWallet) -> VerifyWalletRequest {
        let challenge = sign_challenge(Some(wallet), &wallet.address())
            .await
            .expect("signing succeeds");
        VerifyWalletRequest {
            wallet_address: challenge.address.to_string(),
            signature: challenge.signature,
            message: challenge.message,
        }
    }

    #[tokio::test]
    async fn genuine_signature_verifies_and_issues_credential() {
        let (state, _dir) = test_state();
        let wallet = LocalKeyWallet::random();
        let request = signed_request(&wallet).await;

        let Json(response) = verify_wallet(State(state.clone()), Json(request))
            .await
            .expect("verification succeeds");

        assert!(response.success);
        assert_eq!(response.user.wallet_address, wallet.address());
        assert!(!response.token_hash.is_empty());
        assert!(response.verification_url.contains(&response.token_hash));

        // The issued credential actually redeems against the provider.
        let session = state
            .provider
            .redeem_magic_link(&response.token_hash)
            .await
            .expect("credential redeems");
        assert_eq!(session.user.id, response.user.id);
    }

    #[tokio::test]
    async fn mixed_case_address_is_normalized_in_the_response() {
        let (state, _dir) = test_state();
        let wallet = LocalKeyWallet::random();
        let mut request = signed_request(&wallet).await;
        request.wallet_address = request.wallet_address.to_uppercase().replace("0X", "0x");

        let Json(response) = verify_wallet(State(state), Json(request))
            .await
            .expect("verification succeeds");
        assert_eq!(response.user.wallet_address, wallet.address());
    }

    #[tokio::test]
    async fn malformed_address_is_a_400() {
        let (state, _dir) = test_state();
        let request = VerifyWalletRequest {
            wallet_address: "not-an-address".into(),
            signature: "0x00".into(),
            message: CHALLENGE_MESSAGE.into(),
        };

        let err = verify_wallet(State(state), Json(request)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn drifted_message_is_a_401_with_the_friendly_string() {
        let (state, _dir) = test_state();
        let wallet = LocalKeyWallet::random();
        let mut request = signed_request(&wallet).await;
        request.message.push(' ');

        let err = verify_wallet(State(state), Json(request)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, VERIFICATION_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn signature_from_another_wallet_is_a_401() {
        let (state, _dir) = test_state();
        let wallet = LocalKeyWallet::random();
        let impostor = LocalKeyWallet::random();

        let mut request = signed_request(&impostor).await;
        request.wallet_address = wallet.address().to_string();

        let err = verify_wallet(State(state.clone()), Json(request)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, VERIFICATION_FAILED_MESSAGE);

        // A rejected submission must not have provisioned anything.
        assert_eq!(
            crate::storage::ProfileRepository::new(&state.storage)
                .exists(&wallet.address()),
            false
        );
    }

    #[tokio::test]
    async fn malformed_signature_is_a_401() {
        let (state, _dir) = test_state();
        let wallet = LocalKeyWallet::random();
        let mut request = signed_request(&wallet).await;
        request.signature = "0xdeadbeef".into();

        let err = verify_wallet(State(state), Json(request)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, VERIFICATION_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn repeat_verification_reuses_the_identity() {
        let (state, _dir) = test_state();
        let wallet = LocalKeyWallet::random();

        let Json(first) = verify_wallet(State(state.clone()), Json(signed_request(&wallet).await))
            .await
            .unwrap();
        let Json(second) = verify_wallet(State(state.clone()), Json(signed_request(&wallet).await))
            .await
            .unwrap();

        assert_eq!(first.user.id, second.user.id);
        // Each verification mints a fresh one-time credential.
        assert_ne!(first.token_hash, second.token_hash);
    }
}
