// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hosted identity provider client.
//!
//! Speaks the provider's admin REST surface (GoTrue-shaped), authenticated
//! with a service-role key. All admin calls run server-side only; the key
//! never reaches clients.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::models::WalletAddress;

use super::{
    IdentityProvider, NewProviderUser, ProviderError, ProviderSession, ProviderUser,
    SessionCredential,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the hosted identity provider's admin API.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    base_url: Url,
    service_key: String,
    site_url: String,
    http: Client,
}

/// Provider wire representation of a user record.
#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    email: String,
    #[serde(default)]
    email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    app_metadata: Option<WireAppMetadata>,
}

#[derive(Debug, Deserialize, Default)]
struct WireAppMetadata {
    #[serde(default)]
    wallet_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireGeneratedLink {
    hashed_token: String,
    action_link: String,
}

#[derive(Debug, Deserialize)]
struct WireSession {
    access_token: String,
    user: WireUser,
}

#[derive(Debug, Deserialize)]
struct WireUserList {
    users: Vec<WireUser>,
}

impl From<WireUser> for ProviderUser {
    fn from(user: WireUser) -> Self {
        ProviderUser {
            id: user.id,
            email: user.email,
            email_confirmed: user.email_confirmed_at.is_some(),
            wallet_address: user
                .app_metadata
                .and_then(|m| m.wallet_address)
                .and_then(|a| WalletAddress::parse(&a).ok()),
            created_at: user.created_at.unwrap_or_else(Utc::now),
        }
    }
}

impl HttpIdentityProvider {
    pub fn new(
        base_url: Url,
        service_key: impl Into<String>,
        site_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            service_key: service_key.into(),
            site_url: site_url.into(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::Request(format!("invalid endpoint {path}: {e}")))
    }

    async fn read_body<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn create_user(&self, new_user: NewProviderUser) -> Result<ProviderUser, ProviderError> {
        let response = self
            .http
            .post(self.endpoint("admin/users")?)
            .bearer_auth(&self.service_key)
            .json(&json!({
                "email": new_user.email,
                "email_confirm": true,
                "app_metadata": { "wallet_address": new_user.wallet_address },
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                Ok(Self::read_body::<WireUser>(response).await?.into())
            }
            // The provider reports an email-uniqueness violation as 422.
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
                Err(ProviderError::EmailTaken)
            }
            status => Err(ProviderError::Request(format!(
                "create user returned {status}"
            ))),
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<ProviderUser, ProviderError> {
        let response = self
            .http
            .get(self.endpoint(&format!("admin/users/{user_id}"))?)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                Ok(Self::read_body::<WireUser>(response).await?.into())
            }
            StatusCode::NOT_FOUND => Err(ProviderError::NotFound(user_id.to_string())),
            status => Err(ProviderError::Request(format!("get user returned {status}"))),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> Result<ProviderUser, ProviderError> {
        let mut url = self.endpoint("admin/users")?;
        url.query_pairs_mut().append_pair("email", email);

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "list users returned {}",
                response.status()
            )));
        }

        let list: WireUserList = Self::read_body(response).await?;
        list.users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(Into::into)
            .ok_or_else(|| ProviderError::NotFound(email.to_string()))
    }

    async fn generate_magic_link(&self, email: &str) -> Result<SessionCredential, ProviderError> {
        let response = self
            .http
            .post(self.endpoint("admin/generate_link")?)
            .bearer_auth(&self.service_key)
            .json(&json!({
                "type": "magiclink",
                "email": email,
                "options": { "redirect_to": self.site_url },
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let link: WireGeneratedLink = Self::read_body(response).await?;
                Ok(SessionCredential {
                    token_hash: link.hashed_token,
                    verification_url: link.action_link,
                })
            }
            StatusCode::NOT_FOUND => Err(ProviderError::NotFound(email.to_string())),
            status => Err(ProviderError::Request(format!(
                "generate link returned {status}"
            ))),
        }
    }

    async fn redeem_magic_link(
        &self,
        token_hash: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let response = self
            .http
            .post(self.endpoint("verify")?)
            .json(&json!({
                "type": "magiclink",
                "token_hash": token_hash,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let session: WireSession = Self::read_body(response).await?;
                Ok(ProviderSession {
                    access_token: session.access_token,
                    user: session.user.into(),
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(ProviderError::InvalidToken)
            }
            status => Err(ProviderError::Request(format!("verify returned {status}"))),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(self.endpoint("logout")?)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            // An already-dead session is fine; sign-out is best effort.
            Ok(())
        } else {
            Err(ProviderError::Request(format!(
                "logout returned {}",
                response.status()
            )))
        }
    }

    async fn health(&self) -> Result<(), ProviderError> {
        let response = self
            .http
            .get(self.endpoint("health")?)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::Request(format!(
                "health returned {}",
                response.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> HttpIdentityProvider {
        HttpIdentityProvider::new(
            Url::parse("https://auth.example.com/auth/v1/").unwrap(),
            "service-key",
            "http://localhost:3000",
        )
        .unwrap()
    }

    #[test]
    fn endpoints_join_against_the_base() {
        let p = provider();
        assert_eq!(
            p.endpoint("admin/users").unwrap().as_str(),
            "https://auth.example.com/auth/v1/admin/users"
        );
        assert_eq!(
            p.endpoint("verify").unwrap().as_str(),
            "https://auth.example.com/auth/v1/verify"
        );
    }

    #[test]
    fn wire_user_maps_confirmation_and_metadata() {
        let wire: WireUser = serde_json::from_value(serde_json::json!({
            "id": "user-1",
            "email": "0xabcdef0123456789abcdef0123456789abcdef01@wallet.walletgate.app",
            "email_confirmed_at": "2026-01-01T00:00:00Z",
            "created_at": "2026-01-01T00:00:00Z",
            "app_metadata": { "wallet_address": "0xABCDEF0123456789abcdef0123456789abcdef01" }
        }))
        .unwrap();

        let user: ProviderUser = wire.into();
        assert!(user.email_confirmed);
        assert_eq!(
            user.wallet_address.unwrap().as_str(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn wire_user_without_confirmation_is_unconfirmed() {
        let wire: WireUser = serde_json::from_value(serde_json::json!({
            "id": "user-2",
            "email": "x@wallet.walletgate.app",
        }))
        .unwrap();

        let user: ProviderUser = wire.into();
        assert!(!user.email_confirmed);
        assert!(user.wallet_address.is_none());
    }
}
