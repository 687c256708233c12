// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Raw inbound verification signal log.
//!
//! Every authenticated signal is recorded here before interpretation, raw
//! payload included, so provider disputes can be settled from our own log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One received verification signal. `id` is assigned by the store on append.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignalEvent {
    #[serde(default)]
    pub id: u64,
    /// Internal user id, when the external subject could be mapped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_result: Option<serde_json::Value>,
    pub sandbox_mode: bool,
    /// Verbatim payload as received.
    pub raw: serde_json::Value,
    /// Whether the signal produced a state transition.
    pub processed: bool,
    pub received_at: DateTime<Utc>,
}
