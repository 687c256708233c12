// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::custody::CustodyClient;
use crate::storage::OnboardingDb;
use crate::wallets::MatrixEntry;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<OnboardingDb>,
    /// Absent when custody configuration is incomplete; wallet endpoints
    /// then answer 503.
    pub custody: Option<Arc<CustodyClient>>,
    pub matrix: Arc<Vec<MatrixEntry>>,
    /// Absent when signal ingestion is not configured; the webhook then
    /// rejects everything.
    pub webhook_secret: Option<Arc<Vec<u8>>>,
}

impl AppState {
    pub fn new(db: OnboardingDb, matrix: Vec<MatrixEntry>) -> Self {
        Self {
            db: Arc::new(db),
            custody: None,
            matrix: Arc::new(matrix),
            webhook_secret: None,
        }
    }

    pub fn with_custody(mut self, custody: CustodyClient) -> Self {
        self.custody = Some(Arc::new(custody));
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.webhook_secret = Some(Arc::new(secret.into()));
        self
    }
}
