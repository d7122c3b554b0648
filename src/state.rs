// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::providers::IdentityProvider;
use crate::storage::FileStorage;

#[derive(Clone)]
pub struct AppState {
    pub storage: FileStorage,
    pub provider: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(storage: FileStorage, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { storage, provider }
    }
}
