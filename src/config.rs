// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. Provider clients
//! expose `from_env()`/`is_configured()` and read their own variables through
//! the helpers below.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the embedded database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `ENVIRONMENT` | `development` / `staging` / `production` | `development` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |
//! | `IDENTITY_WEBHOOK_SECRET` | HMAC secret for inbound verification signals | Required for signal ingestion |
//! | `CUSTODY_BASE_URL` | Custody service API base URL | Required for provisioning |
//! | `CUSTODY_ORG_ID` | Custody organisation id | Required for provisioning |
//! | `CUSTODY_AUTH_TOKEN` | Custody bearer credential | Required for provisioning |
//! | `CUSTODY_CRED_ID` | Signing credential id | Required for provisioning |
//! | `CUSTODY_ORIGIN` | Origin embedded in signed client data | Required for provisioning |
//! | `CUSTODY_SIGNING_KEY_PEM` | RSA signing key (PEM, inline) | One of PEM/PATH required |
//! | `CUSTODY_SIGNING_KEY_PATH` | RSA signing key (PEM, file path) | One of PEM/PATH required |

/// Environment variable name for the data directory path.
///
/// The embedded redb database file lives under this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory when `DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// File name of the embedded database inside the data directory.
pub const DATABASE_FILE: &str = "onboarding.redb";

/// Environment variable carrying the webhook HMAC secret.
pub const WEBHOOK_SECRET_ENV: &str = "IDENTITY_WEBHOOK_SECRET";

/// Read a variable; `None` when unset or blank.
pub fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

/// Read a variable, falling back to `default` when unset or blank.
pub fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

/// Read a required variable, returning its name as the error on absence.
pub fn env_required(name: &str) -> Result<String, String> {
    env_optional(name).ok_or_else(|| name.to_string())
}

/// True when the named variable is present and non-blank.
pub fn env_present(name: &str) -> bool {
    env_optional(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_default_falls_back_on_blank() {
        std::env::set_var("ONBOARDING_TEST_BLANK", "   ");
        assert_eq!(env_or_default("ONBOARDING_TEST_BLANK", "fallback"), "fallback");
        std::env::remove_var("ONBOARDING_TEST_BLANK");
    }

    #[test]
    fn env_optional_trims_values() {
        std::env::set_var("ONBOARDING_TEST_TRIM", "  value  ");
        assert_eq!(
            env_optional("ONBOARDING_TEST_TRIM"),
            Some("value".to_string())
        );
        std::env::remove_var("ONBOARDING_TEST_TRIM");
    }
}
