// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet lifecycle: matrix provisioning on first verification, manual
//! top-ups, and reconciliation against the custodian.

pub mod matrix;
pub mod provisioner;
pub mod reconciler;

pub use matrix::{matrix_from_env, production_matrix, testnet_matrix, MatrixEntry};
pub use provisioner::{
    provision_wallets, top_up_wallet, PairFailure, ProvisionError, ProvisionOutcome, TopUpError,
};
pub use reconciler::{reconcile_wallets, ReconcileError, ReconcileReport};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory custody provider for unit tests.

    use std::sync::Mutex;

    use uuid::Uuid;

    use crate::custody::{CustodianWallet, CustodyError, CustodyProvider, ProtocolRound};

    #[derive(Default)]
    struct Script {
        wallets: Vec<CustodianWallet>,
        failing_networks: Vec<String>,
        hidden_from_listing: Vec<String>,
    }

    pub struct ScriptedCustody {
        script: Mutex<Script>,
    }

    impl ScriptedCustody {
        pub fn new() -> Self {
            Self {
                script: Mutex::new(Script::default()),
            }
        }

        /// Make wallet creation fail for every entry on `network`.
        pub fn fail_network(self, network: &str) -> Self {
            self.script
                .lock()
                .unwrap()
                .failing_networks
                .push(network.to_string());
            self
        }

        /// Omit a wallet from list responses while keeping direct lookups.
        pub fn hide_from_listing(&self, wallet_id: &str) {
            self.script
                .lock()
                .unwrap()
                .hidden_from_listing
                .push(wallet_id.to_string());
        }
    }

    impl CustodyProvider for ScriptedCustody {
        async fn create_wallet(
            &self,
            network: &str,
            _external_id: &str,
        ) -> Result<CustodianWallet, CustodyError> {
            let mut script = self.script.lock().unwrap();
            if script.failing_networks.iter().any(|n| n == network) {
                return Err(CustodyError::Protocol {
                    round: ProtocolRound::Execute,
                    status: 500,
                    message: format!("scripted failure for {network}"),
                });
            }
            let wallet = CustodianWallet {
                id: format!("wa-{}", Uuid::new_v4()),
                address: Some(format!("addr-{network}")),
                network: network.to_string(),
                status: Some("Active".to_string()),
            };
            script.wallets.push(wallet.clone());
            Ok(wallet)
        }

        async fn list_wallets(
            &self,
            _external_id: &str,
        ) -> Result<Vec<CustodianWallet>, CustodyError> {
            let script = self.script.lock().unwrap();
            Ok(script
                .wallets
                .iter()
                .filter(|w| !script.hidden_from_listing.contains(&w.id))
                .cloned()
                .collect())
        }

        async fn get_wallet(
            &self,
            wallet_id: &str,
        ) -> Result<Option<CustodianWallet>, CustodyError> {
            let script = self.script.lock().unwrap();
            Ok(script.wallets.iter().find(|w| w.id == wallet_id).cloned())
        }
    }
}
