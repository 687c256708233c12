// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Inbound verification signals from the identity provider.
//!
//! Signals arrive as webhooks authenticated with an HMAC-SHA256 digest over
//! the raw body. Authentication is the only hard gate: once a signal is
//! authentic it is always acknowledged, even when malformed or aimed at an
//! unknown subject, so the provider never retries into an error loop. Every
//! authentic signal is recorded raw before interpretation.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, warn};

use crate::custody::CustodyProvider;
use crate::storage::{AuditAction, AuditLogEntry, OnboardingDb, SignalEvent};
use crate::verification::{transition, ProviderEvent, ReviewOutcome, ReviewResult};
use crate::wallets::{provision_wallets, MatrixEntry, ProvisionError};

/// Header carrying the hex HMAC-SHA256 digest of the raw body.
pub const SIGNATURE_HEADER: &str = "x-payload-digest";

/// Prefix mapping internal user ids to the provider's external subject ids.
const EXTERNAL_ID_PREFIX: &str = "user_";

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("Invalid or missing webhook signature")]
    Unauthenticated,
}

/// External subject id registered with the provider for a user.
pub fn external_user_id(user_id: &str) -> String {
    format!("{EXTERNAL_ID_PREFIX}{user_id}")
}

/// Inverse of [`external_user_id`]; `None` for foreign subject ids.
pub fn user_id_from_external(external_id: &str) -> Option<&str> {
    external_id.strip_prefix(EXTERNAL_ID_PREFIX)
}

/// Provider webhook payload. Unknown fields are preserved in the raw log,
/// not here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignalPayload {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    external_user_id: Option<String>,
    #[serde(default)]
    applicant_id: Option<String>,
    #[serde(default)]
    inspection_id: Option<String>,
    #[serde(default)]
    correlation_id: Option<String>,
    #[serde(default)]
    level_name: Option<String>,
    #[serde(default)]
    review_status: Option<String>,
    #[serde(default)]
    review_result: Option<ReviewResultPayload>,
    #[serde(default)]
    sandbox_mode: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewResultPayload {
    #[serde(default)]
    review_answer: Option<ReviewResult>,
    #[serde(default)]
    reject_labels: Vec<String>,
}

/// Acknowledgement returned to the provider plus side-effect accounting.
#[derive(Debug)]
pub struct IngestOutcome {
    pub status: &'static str,
    pub message: String,
    /// Whether the signal produced a verification state change.
    pub mutated: bool,
    pub wallets_provisioned: usize,
    pub provisioning_failures: usize,
}

impl IngestOutcome {
    fn ack(message: impl Into<String>, mutated: bool) -> Self {
        Self {
            status: "ok",
            message: message.into(),
            mutated,
            wallets_provisioned: 0,
            provisioning_failures: 0,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            mutated: false,
            wallets_provisioned: 0,
            provisioning_failures: 0,
        }
    }
}

/// Verify the hex HMAC-SHA256 digest over the raw body. Comparison is
/// constant-time via the mac's own verifier.
pub fn verify_signature(secret: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Process one inbound signal end to end: authenticate, record, interpret,
/// transition, and trigger first-verification wallet provisioning.
pub async fn ingest_signal<C: CustodyProvider>(
    db: &OnboardingDb,
    custody: Option<&C>,
    matrix: &[MatrixEntry],
    secret: &[u8],
    body: &[u8],
    signature: Option<&str>,
) -> Result<IngestOutcome, SignalError> {
    let signature = signature.ok_or(SignalError::Unauthenticated)?;
    if !verify_signature(secret, body, signature) {
        return Err(SignalError::Unauthenticated);
    }

    let raw: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(%e, "authenticated signal body was not valid JSON");
            // Still worth a log entry: keep the body as a lossy string.
            let lossy = serde_json::Value::String(String::from_utf8_lossy(body).into_owned());
            record_event(db, &lossy, None, "unparseable", false);
            return Ok(IngestOutcome::error("unparseable payload"));
        }
    };
    let payload: SignalPayload = match serde_json::from_value(raw.clone()) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(%e, "authenticated signal payload missing required fields");
            record_event(db, &raw, None, "unknown", false);
            return Ok(IngestOutcome::error("unparseable payload"));
        }
    };

    let user_id = payload
        .external_user_id
        .as_deref()
        .and_then(user_id_from_external)
        .map(str::to_string);

    let Some(event) = ProviderEvent::parse(&payload.event_type) else {
        info!(event_type = payload.event_type, "ignoring unknown signal type");
        record_event(db, &raw, user_id.as_deref(), &payload.event_type, false);
        return Ok(IngestOutcome::ack("event type not handled", false));
    };

    let Some(user_id) = user_id else {
        warn!(
            external_user_id = payload.external_user_id.as_deref().unwrap_or(""),
            "signal subject is not one of ours"
        );
        record_event(db, &raw, None, &payload.event_type, false);
        return Ok(IngestOutcome::ack("unknown subject", false));
    };

    let state = match db.get_user_verification(&user_id) {
        Ok(Some(state)) => state,
        Ok(None) => {
            warn!(user_id, "signal for user we have never seen");
            record_event(db, &raw, Some(&user_id), &payload.event_type, false);
            return Ok(IngestOutcome::ack("unknown subject", false));
        }
        Err(e) => {
            warn!(user_id, %e, "cannot load verification state");
            return Ok(IngestOutcome::error("storage failure"));
        }
    };

    let review = payload
        .review_result
        .as_ref()
        .map(|r| ReviewOutcome {
            answer: r.review_answer,
            reject_labels: r.reject_labels.clone(),
        })
        .unwrap_or_default();

    let next = transition(&state, event, &review);
    let now = chrono::Utc::now();

    let mut updated = state.clone();
    updated.status = next.status;
    updated.result = next.result;
    updated.is_verified = next.is_verified;
    updated.error_message = next.error_message;
    if next.stamps_completed_at && updated.completed_at.is_none() {
        updated.completed_at = Some(now);
    }
    if payload.applicant_id.is_some() {
        updated.applicant_id = payload.applicant_id.clone();
    }
    if payload.inspection_id.is_some() {
        updated.inspection_id = payload.inspection_id.clone();
    }
    updated.updated_at = now;

    // A green verdict completes the identity step; the record update rides
    // in the same commit as the status change.
    let record = if updated.is_verified && !state.is_verified {
        match db.get_record(&user_id) {
            Ok(Some(mut record)) if !record.is_step_complete(2) => {
                record.mark_step(2, now);
                record.evaluate_completion(now);
                Some(record)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(user_id, %e, "cannot load verification record");
                None
            }
        }
    } else {
        None
    };

    let audit = AuditLogEntry::new(&user_id, "system", AuditAction::StatusChanged)
        .with_status_change(Some(state.status), updated.status)
        .with_result_change(state.result, updated.result)
        .with_comment(format!("Provider signal: {}", payload.event_type));
    if let Err(e) = db.commit_verification(&updated, record.as_ref(), audit) {
        warn!(user_id, %e, "cannot persist verification transition");
        return Ok(IngestOutcome::error("storage failure"));
    }
    record_event(db, &raw, Some(&user_id), &payload.event_type, true);

    info!(
        user_id,
        event_type = payload.event_type,
        status = updated.status.as_str(),
        verified = updated.is_verified,
        "verification signal applied"
    );

    let mut outcome = IngestOutcome::ack("signal applied", true);
    if updated.is_verified {
        if let Some(custody) = custody {
            match provision_wallets(db, custody, matrix, &user_id).await {
                Ok(run) => {
                    outcome.wallets_provisioned = run.created.len();
                    outcome.provisioning_failures = run.failures.len();
                }
                // User already holds wallets; nothing to do on re-approval.
                Err(ProvisionError::AlreadyProvisioned) => {}
                Err(e) => {
                    warn!(user_id, %e, "wallet provisioning after verification failed");
                    outcome.provisioning_failures = matrix.len();
                }
            }
        }
    }

    Ok(outcome)
}

/// Record the raw signal. Best effort: a full signal log must never block
/// acknowledgement.
fn record_event(
    db: &OnboardingDb,
    raw: &serde_json::Value,
    user_id: Option<&str>,
    event_type: &str,
    processed: bool,
) {
    let event = SignalEvent {
        id: 0,
        user_id: user_id.map(str::to_string),
        event_type: event_type.to_string(),
        external_user_id: raw
            .get("externalUserId")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        applicant_id: raw
            .get("applicantId")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        inspection_id: raw
            .get("inspectionId")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        correlation_id: raw
            .get("correlationId")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        level_name: raw
            .get("levelName")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        review_status: raw
            .get("reviewStatus")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        review_result: raw.get("reviewResult").cloned(),
        sandbox_mode: raw
            .get("sandboxMode")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        raw: raw.clone(),
        processed,
        received_at: chrono::Utc::now(),
    };
    if let Err(e) = db.append_signal_event(event) {
        warn!(%e, "cannot record signal event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::{save_step, StepSubmission, VerificationStatus};
    use crate::wallets::testing::ScriptedCustody;
    use crate::storage::{Address, PersonalInfo};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    const SECRET: &[u8] = b"test-webhook-secret";

    fn open_db() -> (tempfile::TempDir, OnboardingDb) {
        let dir = tempdir().unwrap();
        let db = OnboardingDb::open(&dir.path().join("test.redb")).unwrap();
        (dir, db)
    }

    fn sign(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn reviewed_green(user_id: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "type": "applicantReviewed",
            "externalUserId": format!("user_{user_id}"),
            "applicantId": "app-1",
            "inspectionId": "insp-1",
            "reviewStatus": "completed",
            "reviewResult": {"reviewAnswer": "GREEN"},
        }))
        .unwrap()
    }

    fn seed_user(db: &OnboardingDb, user_id: &str) {
        save_step(
            db,
            user_id,
            StepSubmission::Personal(PersonalInfo {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
                nationality: "GB".to_string(),
                email_address: "ada@example.com".to_string(),
                phone_number: "+44 20 7946 0958".to_string(),
                address: Address {
                    address_line1: "12 Analytical Row".to_string(),
                    address_line2: None,
                    postal_code: "EC1A 1BB".to_string(),
                    city: "London".to_string(),
                    country_code: "GB".to_string(),
                    state_code: None,
                    country: "United Kingdom".to_string(),
                },
            }),
        )
        .unwrap();
    }

    #[test]
    fn signature_round_trip() {
        let body = b"{\"type\":\"applicantPending\"}";
        assert!(verify_signature(SECRET, body, &sign(body)));
        assert!(!verify_signature(b"other-secret", body, &sign(body)));
        assert!(!verify_signature(SECRET, b"mutated body", &sign(body)));
        assert!(!verify_signature(SECRET, body, "not hex"));
    }

    #[tokio::test]
    async fn missing_signature_is_unauthenticated() {
        let (_dir, db) = open_db();
        let body = reviewed_green("u1");
        let result = ingest_signal::<ScriptedCustody>(&db, None, &[], SECRET, &body, None).await;
        assert!(matches!(result, Err(SignalError::Unauthenticated)));
    }

    #[tokio::test]
    async fn green_review_verifies_marks_step_and_provisions() {
        let (_dir, db) = open_db();
        seed_user(&db, "u1");
        let custody = ScriptedCustody::new();
        let matrix = vec![MatrixEntry {
            currency: "USDT".to_string(),
            network: "EthereumSepolia".to_string(),
        }];

        let body = reviewed_green("u1");
        let outcome = ingest_signal(&db, Some(&custody), &matrix, SECRET, &body, Some(&sign(&body)))
            .await
            .unwrap();

        assert!(outcome.mutated);
        assert_eq!(outcome.wallets_provisioned, 1);

        let state = db.get_user_verification("u1").unwrap().unwrap();
        assert_eq!(state.status, VerificationStatus::Completed);
        assert!(state.is_verified);
        assert_eq!(state.applicant_id.as_deref(), Some("app-1"));

        let record = db.get_record("u1").unwrap().unwrap();
        assert!(record.is_step_complete(2));
    }

    #[tokio::test]
    async fn reingestion_is_idempotent_for_wallets() {
        let (_dir, db) = open_db();
        seed_user(&db, "u1");
        let custody = ScriptedCustody::new();
        let matrix = vec![MatrixEntry {
            currency: "USDT".to_string(),
            network: "EthereumSepolia".to_string(),
        }];

        let body = reviewed_green("u1");
        ingest_signal(&db, Some(&custody), &matrix, SECRET, &body, Some(&sign(&body)))
            .await
            .unwrap();
        let outcome = ingest_signal(&db, Some(&custody), &matrix, SECRET, &body, Some(&sign(&body)))
            .await
            .unwrap();

        assert_eq!(outcome.wallets_provisioned, 0);
        assert_eq!(db.wallet_count("u1").unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_subject_is_acknowledged_without_mutation() {
        let (_dir, db) = open_db();
        let body = reviewed_green("stranger");
        let outcome =
            ingest_signal::<ScriptedCustody>(&db, None, &[], SECRET, &body, Some(&sign(&body)))
                .await
                .unwrap();

        assert_eq!(outcome.status, "ok");
        assert!(!outcome.mutated);
        assert!(db.get_user_verification("stranger").unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_event_type_is_acknowledged() {
        let (_dir, db) = open_db();
        seed_user(&db, "u1");
        let body = serde_json::to_vec(&serde_json::json!({
            "type": "applicantLevelChanged",
            "externalUserId": "user_u1",
        }))
        .unwrap();

        let outcome =
            ingest_signal::<ScriptedCustody>(&db, None, &[], SECRET, &body, Some(&sign(&body)))
                .await
                .unwrap();
        assert_eq!(outcome.status, "ok");
        assert!(!outcome.mutated);

        // Recorded raw, flagged unprocessed.
        let events = db.list_events_for_user("u1").unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].processed);
    }

    #[tokio::test]
    async fn red_review_revokes_verification_but_keeps_step_flags() {
        let (_dir, db) = open_db();
        seed_user(&db, "u1");
        let custody = ScriptedCustody::new();

        let green = reviewed_green("u1");
        ingest_signal(&db, Some(&custody), &[], SECRET, &green, Some(&sign(&green)))
            .await
            .unwrap();

        let red = serde_json::to_vec(&serde_json::json!({
            "type": "applicantReviewed",
            "externalUserId": "user_u1",
            "reviewResult": {"reviewAnswer": "RED", "rejectLabels": ["FORGERY"]},
        }))
        .unwrap();
        ingest_signal(&db, Some(&custody), &[], SECRET, &red, Some(&sign(&red)))
            .await
            .unwrap();

        let state = db.get_user_verification("u1").unwrap().unwrap();
        assert!(!state.is_verified);
        assert_eq!(state.error_message.as_deref(), Some("Rejected: FORGERY"));

        // Step flags are monotonic: the identity step stays complete.
        let record = db.get_record("u1").unwrap().unwrap();
        assert!(record.is_step_complete(2));
    }
}
