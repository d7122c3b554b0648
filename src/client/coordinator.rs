// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Auth/onboarding state machine.
//!
//! One process-wide [`AuthCoordinator`] owns the client's authentication
//! state and exposes it to consumers (routing, UI) through a
//! `tokio::sync::watch` subscription rather than ambient globals.
//!
//! ## States
//!
//! ```text
//! Unauthenticated -> Authenticating -> Authenticated { profile_loaded: false }
//!     -> Authenticated { profile_loaded: true, profile, roles }
//! ```
//!
//! Sign-out re-enters `Unauthenticated` from anywhere.
//!
//! On every transition into "session present" the coordinator fetches the
//! profile and the full role set concurrently and only reports
//! `profile_loaded = true` once both complete: consumers can always tell
//! partial readiness apart from "this identity has no profile".
//!
//! ## Liveness
//!
//! Every teardown/sign-out bumps a generation counter. In-flight fetches
//! re-check the generation after the async boundary and discard their
//! results when it moved, so a fetch that resolves after sign-out can
//! never repopulate cleared state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::auth::{AuthFlowError, Role};
use crate::models::{Identity, Profile};

use super::{DirectoryClient, SessionGateway, SessionIdentity};

/// Observable snapshot of an authenticated session.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    /// The authenticated identity.
    pub identity: Identity,
    /// False until both the profile and role fetches have completed.
    pub profile_loaded: bool,
    /// The identity's profile, `None` if absent (or not yet loaded).
    pub profile: Option<Profile>,
    /// The identity's full role-assignment set.
    pub roles: HashSet<Role>,
}

/// Client authentication state.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// No session.
    Unauthenticated,
    /// A sign-in gesture is redeeming its credential.
    Authenticating,
    /// A session is present.
    Authenticated(AuthSnapshot),
}

/// The process-wide auth state machine.
pub struct AuthCoordinator {
    directory: Arc<dyn DirectoryClient>,
    sessions: Arc<dyn SessionGateway>,
    state_tx: watch::Sender<AuthState>,
    generation: AtomicU64,
}

impl AuthCoordinator {
    pub fn new(directory: Arc<dyn DirectoryClient>, sessions: Arc<dyn SessionGateway>) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Unauthenticated);
        Self {
            directory,
            sessions,
            state_tx,
            generation: AtomicU64::new(0),
        }
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// The current state.
    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    /// Restore a session from a previous visit, if the provider has one.
    pub async fn init(&self) {
        let restored = self.sessions.current_session().await;
        self.on_session_change(restored).await;
    }

    /// Invalidate in-flight work before the owner goes away.
    ///
    /// In-flight fetches started before teardown will observe the bumped
    /// generation and discard their results.
    pub fn teardown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Redeem a one-time session credential from a completed sign-in
    /// gesture.
    ///
    /// Redemption failure surfaces as
    /// [`AuthFlowError::AuthenticationFailed`] and returns the machine to
    /// `Unauthenticated`; there is no retry.
    pub async fn redeem_credential(&self, token_hash: &str) -> Result<(), AuthFlowError> {
        self.state_tx.send_replace(AuthState::Authenticating);

        match self.sessions.redeem(token_hash).await {
            Ok(session) => {
                self.on_session_change(Some(session)).await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "session credential redemption failed");
                self.state_tx.send_replace(AuthState::Unauthenticated);
                Err(AuthFlowError::AuthenticationFailed)
            }
        }
    }

    /// Apply a provider session-change notification.
    ///
    /// With a session present, the profile and role set are fetched
    /// concurrently and joined; `profile_loaded` stays false until both
    /// are in. A profile fetch failure is non-fatal and treated as "no
    /// profile" so onboarding is (re)triggered rather than the app
    /// getting stuck.
    pub async fn on_session_change(&self, session: Option<SessionIdentity>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(session) = session else {
            self.state_tx.send_replace(AuthState::Unauthenticated);
            return;
        };

        self.state_tx
            .send_replace(AuthState::Authenticated(AuthSnapshot {
                identity: session.identity.clone(),
                profile_loaded: false,
                profile: None,
                roles: HashSet::new(),
            }));

        let identity_id = session.identity.id.clone();
        let (profile, roles) = tokio::join!(
            self.directory.fetch_profile(&identity_id),
            self.directory.fetch_roles(&identity_id),
        );

        // Discard stale results: sign-out or teardown happened while the
        // fetches were in flight.
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(%identity_id, "discarding stale profile/role fetch");
            return;
        }

        let profile = profile.unwrap_or_else(|e| {
            tracing::warn!(%identity_id, error = %e, "profile fetch failed, treating as absent");
            None
        });
        let roles: HashSet<Role> = roles
            .unwrap_or_else(|e| {
                tracing::warn!(%identity_id, error = %e, "role fetch failed, treating as empty");
                Vec::new()
            })
            .into_iter()
            .collect();

        self.state_tx
            .send_replace(AuthState::Authenticated(AuthSnapshot {
                identity: session.identity,
                profile_loaded: true,
                profile,
                roles,
            }));
    }

    /// Membership check against the fetched role set.
    pub fn has_role(&self, role: Role) -> bool {
        match &*self.state_tx.borrow() {
            AuthState::Authenticated(snapshot) => snapshot.roles.contains(&role),
            _ => false,
        }
    }

    /// Whether the current user still needs onboarding.
    ///
    /// True iff authenticated AND (profile absent OR not onboarded). This
    /// is the single source of truth for onboarding routing; consumers
    /// must delegate here rather than inferring from profile existence or
    /// role-set shape, and should gate on `profile_loaded` before acting.
    pub fn needs_onboarding(&self) -> bool {
        match &*self.state_tx.borrow() {
            AuthState::Authenticated(snapshot) => {
                snapshot.profile.as_ref().is_none_or(|p| !p.onboarded)
            }
            _ => false,
        }
    }

    /// Complete onboarding for the current identity.
    ///
    /// Idempotent: calling it when already onboarded is a no-op, not an
    /// error. On success the cached profile is updated optimistically.
    pub async fn complete_onboarding(&self) -> Result<(), AuthFlowError> {
        let snapshot = match &*self.state_tx.borrow() {
            AuthState::Authenticated(snapshot) => snapshot.clone(),
            _ => return Err(AuthFlowError::AuthenticationFailed),
        };

        if snapshot.profile.as_ref().is_some_and(|p| p.onboarded) {
            return Ok(());
        }

        self.directory
            .complete_onboarding(&snapshot.identity.id)
            .await
            .map_err(|e| AuthFlowError::ProvisioningFailed(e.to_string()))?;

        self.state_tx.send_modify(|state| {
            if let AuthState::Authenticated(snapshot) = state {
                if let Some(profile) = &mut snapshot.profile {
                    profile.onboarded = true;
                }
            }
        });
        Ok(())
    }

    /// Sign out.
    ///
    /// Local identity/profile/role state is cleared unconditionally, even
    /// if the provider call fails: a network error on sign-out must not
    /// leave the client looking signed in.
    pub async fn sign_out(&self) {
        if let Err(e) = self.sessions.sign_out().await {
            tracing::warn!(error = %e, "provider sign-out failed, clearing local state anyway");
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state_tx.send_replace(AuthState::Unauthenticated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::client::local::{InProcessDirectory, ProviderSessionGateway};
    use crate::client::DirectoryError;
    use crate::identity::{issue_session_credential, resolve_or_create_identity};
    use crate::models::WalletAddress;
    use crate::providers::{IdentityProvider, MemoryIdentityProvider};
    use crate::storage::{FileStorage, ProfileRepository, StoragePaths};
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    fn test_storage() -> (FileStorage, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let mut storage = FileStorage::new(StoragePaths::new(dir.path()));
        storage.initialize().expect("initialize");
        (storage, dir)
    }

    fn addr(n: u8) -> WalletAddress {
        WalletAddress::parse(&format!("0x{}{:02x}", "3c".repeat(19), n)).unwrap()
    }

    /// Wire a coordinator to in-process collaborators, returning the
    /// pieces a test needs to drive the flow.
    fn wired(
        storage: &FileStorage,
    ) -> (
        AuthCoordinator,
        Arc<MemoryIdentityProvider>,
        Arc<ProviderSessionGateway>,
    ) {
        let provider = Arc::new(MemoryIdentityProvider::new("http://localhost:3000"));
        let directory = Arc::new(InProcessDirectory::new(storage.clone()));
        let gateway = Arc::new(ProviderSessionGateway::new(provider.clone()));
        let coordinator = AuthCoordinator::new(directory, gateway.clone());
        (coordinator, provider, gateway)
    }

    async fn provisioned_credential(
        storage: &FileStorage,
        provider: &dyn IdentityProvider,
        n: u8,
    ) -> String {
        let identity = resolve_or_create_identity(storage, provider, &addr(n))
            .await
            .unwrap();
        issue_session_credential(provider, &identity)
            .await
            .unwrap()
            .token_hash
    }

    #[tokio::test]
    async fn init_without_session_is_unauthenticated() {
        let (storage, _dir) = test_storage();
        let (coordinator, _, _) = wired(&storage);

        coordinator.init().await;
        assert_eq!(coordinator.state(), AuthState::Unauthenticated);
        assert!(!coordinator.needs_onboarding());
    }

    #[tokio::test]
    async fn redeeming_a_credential_authenticates_and_loads_the_profile() {
        let (storage, _dir) = test_storage();
        let (coordinator, provider, _) = wired(&storage);
        let token = provisioned_credential(&storage, provider.as_ref(), 1).await;

        coordinator.redeem_credential(&token).await.unwrap();

        let AuthState::Authenticated(snapshot) = coordinator.state() else {
            panic!("expected authenticated state");
        };
        assert!(snapshot.profile_loaded);
        assert!(snapshot.profile.is_some());
        assert!(coordinator.has_role(Role::Student));
        assert!(!coordinator.has_role(Role::Admin));
        assert!(coordinator.needs_onboarding());
    }

    #[tokio::test]
    async fn redeeming_a_bad_credential_returns_to_unauthenticated() {
        let (storage, _dir) = test_storage();
        let (coordinator, _, _) = wired(&storage);

        let result = coordinator.redeem_credential("bogus-token").await;
        assert!(matches!(result, Err(AuthFlowError::AuthenticationFailed)));
        assert_eq!(coordinator.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn a_redeemed_credential_cannot_be_replayed() {
        let (storage, _dir) = test_storage();
        let (coordinator, provider, _) = wired(&storage);
        let token = provisioned_credential(&storage, provider.as_ref(), 2).await;

        coordinator.redeem_credential(&token).await.unwrap();
        coordinator.sign_out().await;

        let replay = coordinator.redeem_credential(&token).await;
        assert!(matches!(replay, Err(AuthFlowError::AuthenticationFailed)));
        assert_eq!(coordinator.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn complete_onboarding_is_idempotent_and_authoritative() {
        let (storage, _dir) = test_storage();
        let (coordinator, provider, _) = wired(&storage);
        let token = provisioned_credential(&storage, provider.as_ref(), 3).await;
        coordinator.redeem_credential(&token).await.unwrap();

        assert!(coordinator.needs_onboarding());

        coordinator.complete_onboarding().await.unwrap();
        assert!(!coordinator.needs_onboarding());

        // Second call is a no-op, not an error.
        coordinator.complete_onboarding().await.unwrap();
        assert!(!coordinator.needs_onboarding());

        // The flag is durable, not just cached.
        let profile = ProfileRepository::new(&storage)
            .get_by_wallet(&addr(3))
            .unwrap();
        assert!(profile.onboarded);
    }

    #[tokio::test]
    async fn complete_onboarding_requires_a_session() {
        let (storage, _dir) = test_storage();
        let (coordinator, _, _) = wired(&storage);

        let result = coordinator.complete_onboarding().await;
        assert!(matches!(result, Err(AuthFlowError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn sign_out_clears_state_even_when_the_provider_fails() {
        struct FailingGateway;

        #[async_trait]
        impl SessionGateway for FailingGateway {
            async fn current_session(&self) -> Option<SessionIdentity> {
                Some(SessionIdentity {
                    identity: Identity {
                        id: "user-f".into(),
                        email: "f@wallet.walletgate.app".into(),
                    },
                    access_token: "tok".into(),
                })
            }
            async fn redeem(&self, _token: &str) -> Result<SessionIdentity, AuthFlowError> {
                Err(AuthFlowError::AuthenticationFailed)
            }
            async fn sign_out(&self) -> Result<(), AuthFlowError> {
                Err(AuthFlowError::AuthenticationFailed)
            }
        }

        let (storage, _dir) = test_storage();
        let directory = Arc::new(InProcessDirectory::new(storage.clone()));
        let coordinator = AuthCoordinator::new(directory, Arc::new(FailingGateway));

        coordinator.init().await;
        assert!(matches!(coordinator.state(), AuthState::Authenticated(_)));

        coordinator.sign_out().await;
        assert_eq!(coordinator.state(), AuthState::Unauthenticated);
        assert!(!coordinator.needs_onboarding());
    }

    #[tokio::test]
    async fn profile_fetch_failure_is_treated_as_no_profile() {
        struct FlakyDirectory;

        #[async_trait]
        impl DirectoryClient for FlakyDirectory {
            async fn fetch_profile(
                &self,
                _identity_id: &str,
            ) -> Result<Option<Profile>, DirectoryError> {
                Err(DirectoryError::Read("store offline".into()))
            }
            async fn fetch_roles(&self, _identity_id: &str) -> Result<Vec<Role>, DirectoryError> {
                Err(DirectoryError::Read("store offline".into()))
            }
            async fn complete_onboarding(&self, _identity_id: &str) -> Result<(), DirectoryError> {
                Ok(())
            }
        }

        let (storage, _dir) = test_storage();
        let (_, provider, gateway) = wired(&storage);
        let token = provisioned_credential(&storage, provider.as_ref(), 4).await;

        let coordinator = AuthCoordinator::new(Arc::new(FlakyDirectory), gateway);
        coordinator.redeem_credential(&token).await.unwrap();

        let AuthState::Authenticated(snapshot) = coordinator.state() else {
            panic!("expected authenticated state");
        };
        // Ready, but with no profile and no roles: onboarding re-triggers
        // instead of the app getting stuck.
        assert!(snapshot.profile_loaded);
        assert!(snapshot.profile.is_none());
        assert!(snapshot.roles.is_empty());
        assert!(coordinator.needs_onboarding());
    }

    #[tokio::test]
    async fn sign_out_discards_in_flight_fetch_results() {
        /// Directory whose profile fetch blocks until released.
        struct GatedDirectory {
            release: Arc<Notify>,
            profile: Profile,
        }

        #[async_trait]
        impl DirectoryClient for GatedDirectory {
            async fn fetch_profile(
                &self,
                _identity_id: &str,
            ) -> Result<Option<Profile>, DirectoryError> {
                self.release.notified().await;
                Ok(Some(self.profile.clone()))
            }
            async fn fetch_roles(&self, _identity_id: &str) -> Result<Vec<Role>, DirectoryError> {
                Ok(vec![Role::Student])
            }
            async fn complete_onboarding(&self, _identity_id: &str) -> Result<(), DirectoryError> {
                Ok(())
            }
        }

        let (storage, _dir) = test_storage();
        let (_, provider, gateway) = wired(&storage);
        let token = provisioned_credential(&storage, provider.as_ref(), 5).await;
        let session = gateway.redeem(&token).await.unwrap();

        let release = Arc::new(Notify::new());
        let directory = Arc::new(GatedDirectory {
            release: release.clone(),
            profile: Profile::new_linked(addr(5), &session.identity.id),
        });
        let coordinator = Arc::new(AuthCoordinator::new(directory, gateway));

        // Start the session change; its profile fetch parks on the gate.
        let task = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.on_session_change(Some(session)).await })
        };
        tokio::task::yield_now().await;

        // Sign out while the fetch is still in flight, then release it.
        coordinator.sign_out().await;
        release.notify_one();
        task.await.unwrap();

        // The resolved fetch must not have repopulated anything.
        assert_eq!(coordinator.state(), AuthState::Unauthenticated);
        assert!(!coordinator.has_role(Role::Student));
        assert!(!coordinator.needs_onboarding());
    }
}
