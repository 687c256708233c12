// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Customer onboarding service: the four-step verification pipeline,
//! identity provider signal ingestion, and custodial wallet provisioning.

pub mod api;
pub mod auth;
pub mod config;
pub mod custody;
pub mod error;
pub mod signals;
pub mod state;
pub mod storage;
pub mod verification;
pub mod wallets;
