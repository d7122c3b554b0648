// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory identity provider.
//!
//! Implements the same contract as the hosted provider (email
//! uniqueness, pre-confirmed users, single-redemption tokens) against
//! process-local state. Used in development mode (no `PROVIDER_BASE_URL`)
//! and throughout the test suite.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    IdentityProvider, NewProviderUser, ProviderError, ProviderSession, ProviderUser,
    SessionCredential,
};

#[derive(Default)]
struct MemoryState {
    /// Users by id.
    users: HashMap<String, ProviderUser>,
    /// Email -> user id (the provider-level uniqueness constraint).
    emails: HashMap<String, String>,
    /// Outstanding one-time tokens -> user id.
    links: HashMap<String, String>,
    /// Live access tokens -> user id.
    sessions: HashMap<String, String>,
}

/// Process-local identity provider.
#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    state: Arc<RwLock<MemoryState>>,
    site_url: String,
}

impl MemoryIdentityProvider {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            site_url: site_url.into(),
        }
    }

    /// Number of registered users. Test observability.
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_user(&self, new_user: NewProviderUser) -> Result<ProviderUser, ProviderError> {
        let mut state = self.state.write().await;
        if state.emails.contains_key(&new_user.email) {
            return Err(ProviderError::EmailTaken);
        }

        let user = ProviderUser {
            id: Uuid::new_v4().to_string(),
            email: new_user.email.clone(),
            email_confirmed: true,
            wallet_address: Some(new_user.wallet_address),
            created_at: Utc::now(),
        };
        state.emails.insert(new_user.email, user.id.clone());
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: &str) -> Result<ProviderUser, ProviderError> {
        self.state
            .read()
            .await
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(user_id.to_string()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<ProviderUser, ProviderError> {
        let state = self.state.read().await;
        let id = state
            .emails
            .get(email)
            .ok_or_else(|| ProviderError::NotFound(email.to_string()))?;
        state
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(email.to_string()))
    }

    async fn generate_magic_link(&self, email: &str) -> Result<SessionCredential, ProviderError> {
        let mut state = self.state.write().await;
        let user_id = state
            .emails
            .get(email)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(email.to_string()))?;

        let token_hash = Uuid::new_v4().simple().to_string();
        state.links.insert(token_hash.clone(), user_id);

        let verification_url = format!(
            "{}/auth/confirm?token_hash={token_hash}&type=magiclink",
            self.site_url.trim_end_matches('/')
        );
        Ok(SessionCredential {
            token_hash,
            verification_url,
        })
    }

    async fn redeem_magic_link(
        &self,
        token_hash: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let mut state = self.state.write().await;
        // Remove on redemption: a token is good for exactly one session.
        let user_id = state
            .links
            .remove(token_hash)
            .ok_or(ProviderError::InvalidToken)?;
        let user = state
            .users
            .get(&user_id)
            .cloned()
            .ok_or(ProviderError::InvalidToken)?;

        let access_token = Uuid::new_v4().simple().to_string();
        state.sessions.insert(access_token.clone(), user_id);
        Ok(ProviderSession { access_token, user })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        self.state.write().await.sessions.remove(access_token);
        Ok(())
    }

    async fn health(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
