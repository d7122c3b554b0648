// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for profile/role storage | `/data` |
//! | `PROVIDER_BASE_URL` | Identity provider base URL | unset = in-memory dev provider |
//! | `PROVIDER_SERVICE_KEY` | Service-role key for provider admin calls | Required with `PROVIDER_BASE_URL` |
//! | `SITE_URL` | Redirect target embedded in magic links | `http://localhost:3000` |
//! | `SEED_ADMIN_WALLET` | Wallet address to pre-provision an unlinked admin profile for | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::net::SocketAddr;

use url::Url;

use crate::providers::ProviderError;

/// Environment variable name for the storage directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the identity provider base URL.
pub const PROVIDER_BASE_URL_ENV: &str = "PROVIDER_BASE_URL";

/// Environment variable name for the provider service-role key.
pub const PROVIDER_SERVICE_KEY_ENV: &str = "PROVIDER_SERVICE_KEY";

/// Environment variable name for the magic-link redirect target.
pub const SITE_URL_ENV: &str = "SITE_URL";

/// Environment variable name for admin profile seeding.
pub const SEED_ADMIN_WALLET_ENV: &str = "SEED_ADMIN_WALLET";

const DEFAULT_SITE_URL: &str = "http://localhost:3000";

/// Identity provider connection settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: Url,
    pub service_key: String,
}

/// Typed server configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: String,
    pub site_url: String,
    /// `None` selects the in-memory development provider.
    pub provider: Option<ProviderConfig>,
    pub seed_admin_wallet: Option<String>,
}

impl ServerConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ProviderError> {
        let host = env_or_default("HOST", "0.0.0.0");
        let port: u16 = env_or_default("PORT", "8080").parse().unwrap_or(8080);
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| ProviderError::MissingConfig(format!("invalid bind address: {e}")))?;

        let data_dir = env_or_default(DATA_DIR_ENV, crate::storage::paths::DATA_ROOT);
        let site_url = env_or_default(SITE_URL_ENV, DEFAULT_SITE_URL);

        let provider = match env::var(PROVIDER_BASE_URL_ENV) {
            Ok(raw) => {
                let base_url = Url::parse(&raw).map_err(|e| {
                    ProviderError::MissingConfig(format!("invalid {PROVIDER_BASE_URL_ENV}: {e}"))
                })?;
                let service_key = env::var(PROVIDER_SERVICE_KEY_ENV).map_err(|_| {
                    ProviderError::MissingConfig(format!(
                        "{PROVIDER_SERVICE_KEY_ENV} is required when {PROVIDER_BASE_URL_ENV} is set"
                    ))
                })?;
                Some(ProviderConfig {
                    base_url,
                    service_key,
                })
            }
            Err(_) => None,
        };

        Ok(Self {
            bind_addr,
            data_dir,
            site_url,
            provider,
            seed_admin_wallet: env::var(SEED_ADMIN_WALLET_ENV).ok(),
        })
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
