// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use walletgate::api::router;
use walletgate::auth::Role;
use walletgate::config::ServerConfig;
use walletgate::models::{Profile, WalletAddress};
use walletgate::providers::{HttpIdentityProvider, IdentityProvider, MemoryIdentityProvider};
use walletgate::state::AppState;
use walletgate::storage::{FileStorage, ProfileRepository, StorageError, StoragePaths};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ServerConfig::from_env().expect("Failed to load configuration");

    let mut storage = FileStorage::new(StoragePaths::new(&config.data_dir));
    storage
        .initialize()
        .expect("Failed to initialize storage directories");

    let provider: Arc<dyn IdentityProvider> = match &config.provider {
        Some(provider_config) => {
            tracing::info!(base_url = %provider_config.base_url, "using hosted identity provider");
            Arc::new(
                HttpIdentityProvider::new(
                    provider_config.base_url.clone(),
                    provider_config.service_key.clone(),
                    config.site_url.clone(),
                )
                .expect("Failed to build provider client"),
            )
        }
        None => {
            tracing::warn!(
                "PROVIDER_BASE_URL not set, running with the in-memory provider; \
                 sessions will not survive a restart"
            );
            Arc::new(MemoryIdentityProvider::new(config.site_url.clone()))
        }
    };

    if let Some(seed) = &config.seed_admin_wallet {
        seed_admin_profile(&storage, seed);
    }

    let state = AppState::new(storage, provider);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind server address");
    tracing::info!(addr = %config.bind_addr, "walletgate listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

/// Pre-provision an unlinked admin profile for a wallet address.
///
/// The profile gets linked to its identity on the wallet's first login.
/// Safe to run on every boot.
fn seed_admin_profile(storage: &FileStorage, wallet: &str) {
    let address = match WalletAddress::parse(wallet) {
        Ok(address) => address,
        Err(e) => {
            tracing::error!(wallet, error = %e, "SEED_ADMIN_WALLET is not a valid address");
            return;
        }
    };

    let repo = ProfileRepository::new(storage);
    match repo.create(&Profile::new_unlinked(address.clone(), Role::Admin)) {
        Ok(()) => tracing::info!(%address, "seeded unlinked admin profile"),
        Err(StorageError::AlreadyExists(_)) => {
            tracing::debug!(%address, "admin profile already present, skipping seed");
        }
        Err(e) => tracing::error!(%address, error = %e, "failed to seed admin profile"),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
