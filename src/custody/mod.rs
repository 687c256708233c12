// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custody service integration: the signed-challenge user-action protocol
//! and the wallet API built on it.

pub mod client;
pub mod signer;

pub use client::{CustodianWallet, CustodyClient, CustodyError, CustodyProvider, ProtocolRound};
pub use signer::{CredentialSigner, SignedAssertion};
