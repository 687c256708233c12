// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custody service client.
//!
//! Wallet mutations require a signed user action: every mutating call runs
//! the four-round challenge protocol (Init → Sign → Complete → Execute)
//! before the actual request goes out with the resulting one-time token.
//! Read calls skip the protocol.

use std::{future::Future, time::Duration};

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::signer::CredentialSigner;
use crate::config::{env_optional, env_or_default, env_required};

const DEFAULT_BASE_URL: &str = "https://api.custody.example.com";

/// Header carrying the one-time user-action token on mutating requests.
const USER_ACTION_HEADER: &str = "X-User-Action";

/// Round of the signed-challenge protocol an error surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolRound {
    Init,
    Sign,
    Complete,
    Execute,
}

impl std::fmt::Display for ProtocolRound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Sign => "sign",
            Self::Complete => "complete",
            Self::Execute => "execute",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("custody configuration missing: {0}")]
    MissingConfig(String),

    #[error("custody signing failed: {0}")]
    Signing(String),

    #[error("custody {round} round rejected (status {status}): {message}")]
    Protocol {
        round: ProtocolRound,
        status: u16,
        message: String,
    },

    #[error("custody service unavailable: {0}")]
    Unavailable(String),

    #[error("custody response was invalid: {0}")]
    InvalidResponse(String),
}

/// Wallet as reported by the custodian.
#[derive(Debug, Clone, Deserialize)]
pub struct CustodianWallet {
    pub id: String,
    #[serde(default)]
    pub address: Option<String>,
    pub network: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Seam for wallet provisioning and reconciliation. The production
/// implementation is [`CustodyClient`]; tests substitute scripted fakes.
pub trait CustodyProvider {
    /// Create a wallet on the given network, tagged with our external id.
    fn create_wallet(
        &self,
        network: &str,
        external_id: &str,
    ) -> impl Future<Output = Result<CustodianWallet, CustodyError>> + Send;

    /// All custodian wallets tagged with the external id.
    fn list_wallets(
        &self,
        external_id: &str,
    ) -> impl Future<Output = Result<Vec<CustodianWallet>, CustodyError>> + Send;

    /// Confirmatory single-wallet lookup. `Ok(None)` means the custodian
    /// definitively reports the wallet gone.
    fn get_wallet(
        &self,
        wallet_id: &str,
    ) -> impl Future<Output = Result<Option<CustodianWallet>, CustodyError>> + Send;
}

/// HTTP client for the custody service.
pub struct CustodyClient {
    base_url: String,
    org_id: String,
    auth_token: String,
    signer: CredentialSigner,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
    challenge: String,
    #[serde(rename = "challengeIdentifier")]
    challenge_identifier: String,
}

#[derive(Debug, Deserialize)]
struct UserActionResponse {
    #[serde(rename = "userAction")]
    user_action: String,
}

impl CustodyClient {
    /// True when every variable needed for provisioning is present.
    pub fn is_configured() -> bool {
        use crate::config::env_present;
        env_present("CUSTODY_ORG_ID")
            && env_present("CUSTODY_AUTH_TOKEN")
            && env_present("CUSTODY_CRED_ID")
            && env_present("CUSTODY_ORIGIN")
            && (env_present("CUSTODY_SIGNING_KEY_PEM") || env_present("CUSTODY_SIGNING_KEY_PATH"))
    }

    pub fn from_env() -> Result<Self, CustodyError> {
        let base_url = env_or_default("CUSTODY_BASE_URL", DEFAULT_BASE_URL);
        let org_id = env_required("CUSTODY_ORG_ID").map_err(CustodyError::MissingConfig)?;
        let auth_token = env_required("CUSTODY_AUTH_TOKEN").map_err(CustodyError::MissingConfig)?;
        let credential_id = env_required("CUSTODY_CRED_ID").map_err(CustodyError::MissingConfig)?;
        let origin = env_required("CUSTODY_ORIGIN").map_err(CustodyError::MissingConfig)?;
        let pem = load_signing_key_pem()?;
        let signer = CredentialSigner::from_pem(credential_id, origin, &pem)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CustodyError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            org_id,
            auth_token,
            signer,
            http,
        })
    }

    // =========================================================================
    // Signed User-Action Protocol
    // =========================================================================

    /// Run rounds Init → Sign → Complete for the given intended request and
    /// return the one-time user-action token.
    async fn user_action_token(
        &self,
        method: &str,
        path: &str,
        body: &Value,
    ) -> Result<String, CustodyError> {
        // Init: announce the intended request, receive a challenge.
        let payload = serde_json::to_string(body)
            .map_err(|e| CustodyError::Signing(format!("payload serialization: {e}")))?;
        let init_body = json!({
            "userActionPayload": payload,
            "userActionHttpMethod": method,
            "userActionHttpPath": path,
        });
        let challenge: ChallengeResponse = self
            .post_json(ProtocolRound::Init, "/auth/action/init", &init_body, None)
            .await?;

        // Sign: local round, no network.
        let assertion = self.signer.sign(&challenge.challenge)?;

        // Complete: exchange the assertion for the token.
        let complete_body = json!({
            "challengeIdentifier": challenge.challenge_identifier,
            "firstFactor": {
                "kind": "Key",
                "credentialAssertion": {
                    "credId": assertion.credential_id,
                    "clientData": assertion.client_data,
                    "signature": assertion.signature,
                }
            }
        });
        let action: UserActionResponse = self
            .post_json(ProtocolRound::Complete, "/auth/action", &complete_body, None)
            .await?;

        Ok(action.user_action)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        round: ProtocolRound,
        path: &str,
        body: &Value,
        user_action: Option<&str>,
    ) -> Result<T, CustodyError> {
        let url = format!("{}{path}", self.base_url.trim_end_matches('/'));
        let mut request = self
            .http
            .post(&url)
            .bearer_auth(&self.auth_token)
            .json(body);
        if let Some(token) = user_action {
            request = request.header(USER_ACTION_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CustodyError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CustodyError::Protocol {
                round,
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CustodyError::InvalidResponse(e.to_string()))
    }

    async fn get_json(&self, path: &str) -> Result<reqwest::Response, CustodyError> {
        let url = format!("{}{path}", self.base_url.trim_end_matches('/'));
        self.http
            .get(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| CustodyError::Unavailable(e.to_string()))
    }
}

impl CustodyProvider for CustodyClient {
    async fn create_wallet(
        &self,
        network: &str,
        external_id: &str,
    ) -> Result<CustodianWallet, CustodyError> {
        let path = format!("/orgs/{}/wallets", self.org_id);
        let body = json!({
            "network": network,
            "externalId": external_id,
        });

        let token = self.user_action_token("POST", &path, &body).await?;
        debug!(network, external_id, "executing signed wallet creation");

        self.post_json(ProtocolRound::Execute, &path, &body, Some(&token))
            .await
    }

    async fn list_wallets(&self, external_id: &str) -> Result<Vec<CustodianWallet>, CustodyError> {
        let path = format!("/orgs/{}/wallets?externalId={external_id}", self.org_id);
        let response = self.get_json(&path).await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CustodyError::Protocol {
                round: ProtocolRound::Execute,
                status: status.as_u16(),
                message,
            });
        }

        #[derive(Deserialize)]
        struct WalletList {
            items: Vec<CustodianWallet>,
        }
        let list: WalletList = response
            .json()
            .await
            .map_err(|e| CustodyError::InvalidResponse(e.to_string()))?;
        Ok(list.items)
    }

    async fn get_wallet(&self, wallet_id: &str) -> Result<Option<CustodianWallet>, CustodyError> {
        let path = format!("/orgs/{}/wallets/{wallet_id}", self.org_id);
        let response = self.get_json(&path).await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CustodyError::Protocol {
                round: ProtocolRound::Execute,
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<CustodianWallet>()
            .await
            .map(Some)
            .map_err(|e| CustodyError::InvalidResponse(e.to_string()))
    }
}

fn load_signing_key_pem() -> Result<String, CustodyError> {
    if let Some(pem) = env_optional("CUSTODY_SIGNING_KEY_PEM") {
        // Allow `\n`-escaped single-line values from env files.
        return Ok(pem.replace("\\n", "\n"));
    }
    if let Some(path) = env_optional("CUSTODY_SIGNING_KEY_PATH") {
        return std::fs::read_to_string(&path).map_err(|e| {
            CustodyError::MissingConfig(format!("cannot read CUSTODY_SIGNING_KEY_PATH {path}: {e}"))
        });
    }
    Err(CustodyError::MissingConfig(
        "CUSTODY_SIGNING_KEY_PEM or CUSTODY_SIGNING_KEY_PATH".to_string(),
    ))
}
