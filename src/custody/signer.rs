// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Challenge signing for the custody user-action protocol.
//!
//! The custodian issues a random challenge; we answer with a WebAuthn-style
//! assertion: a canonical client-data JSON embedding the challenge, signed
//! with our registered RSA credential (PKCS#1 v1.5, SHA-256). Client data
//! and signature travel base64url-encoded without padding.

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::{
    rand::SystemRandom,
    signature::{RsaKeyPair, RSA_PKCS1_SHA256},
};
use serde::Serialize;

use super::client::CustodyError;

/// Client data envelope signed for each challenge. Field order matters: the
/// custodian re-serializes and compares bytes.
#[derive(Debug, Serialize)]
struct ClientData<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    challenge: &'a str,
    origin: &'a str,
    #[serde(rename = "crossOrigin")]
    cross_origin: bool,
}

/// A signed challenge assertion ready for the protocol's Sign round.
#[derive(Debug, Clone)]
pub struct SignedAssertion {
    pub credential_id: String,
    /// base64url (unpadded) canonical client-data JSON.
    pub client_data: String,
    /// base64url (unpadded) RSA PKCS#1 v1.5 SHA-256 signature over the
    /// client-data bytes.
    pub signature: String,
}

/// RSA credential used to answer custody challenges.
pub struct CredentialSigner {
    credential_id: String,
    origin: String,
    key: RsaKeyPair,
    rng: SystemRandom,
}

impl CredentialSigner {
    /// Build a signer from a PKCS#8 PEM private key.
    pub fn from_pem(
        credential_id: impl Into<String>,
        origin: impl Into<String>,
        pem_str: &str,
    ) -> Result<Self, CustodyError> {
        let pem = pem::parse(pem_str)
            .map_err(|e| CustodyError::Signing(format!("invalid PEM: {e}")))?;
        let key = RsaKeyPair::from_pkcs8(pem.contents())
            .map_err(|e| CustodyError::Signing(format!("invalid RSA key: {e}")))?;

        Ok(Self {
            credential_id: credential_id.into(),
            origin: origin.into(),
            key,
            rng: SystemRandom::new(),
        })
    }

    /// Sign the custodian's challenge string.
    pub fn sign(&self, challenge: &str) -> Result<SignedAssertion, CustodyError> {
        let client_data = ClientData {
            kind: "key.get",
            challenge,
            origin: &self.origin,
            cross_origin: false,
        };
        let client_data_json = serde_json::to_vec(&client_data)
            .map_err(|e| CustodyError::Signing(format!("client data serialization: {e}")))?;

        let mut signature = vec![0u8; self.key.public().modulus_len()];
        self.key
            .sign(&RSA_PKCS1_SHA256, &self.rng, &client_data_json, &mut signature)
            .map_err(|e| CustodyError::Signing(format!("RSA signing failed: {e}")))?;

        Ok(SignedAssertion {
            credential_id: self.credential_id.clone(),
            client_data: Base64UrlUnpadded::encode_string(&client_data_json),
            signature: Base64UrlUnpadded::encode_string(&signature),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_data_serializes_in_canonical_field_order() {
        let data = ClientData {
            kind: "key.get",
            challenge: "abc123",
            origin: "https://app.example.com",
            cross_origin: false,
        };
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(
            json,
            r#"{"type":"key.get","challenge":"abc123","origin":"https://app.example.com","crossOrigin":false}"#
        );
    }

    #[test]
    fn base64url_encoding_is_unpadded() {
        // One byte encodes to two characters, never with '='.
        let encoded = Base64UrlUnpadded::encode_string(&[0xfb]);
        assert!(!encoded.contains('='));
        assert_eq!(encoded, "-w");
    }

    #[test]
    fn from_pem_rejects_garbage() {
        assert!(CredentialSigner::from_pem("cred-1", "https://x", "not a pem").is_err());
    }
}
