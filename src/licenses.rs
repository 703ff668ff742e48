//! License lifecycle and the validation decision ladder.
//!
//! Licenses have no persisted status: expiry and quota exhaustion are
//! recomputed on every validation, and explicit deletion is the only
//! terminal transition.

use chrono::Utc;
use serde::Serialize;

use crate::db::{queries, DbPool};
use crate::error::{AppError, Result};
use crate::models::{CreateLicense, License, UpdateLicense, MAX_HWID_BINDINGS};

/// Outcome of a validation call. Expected business outcomes are values, not
/// errors; callers branch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    UnknownKey,
    Expired,
    DeviceMismatch,
    QuotaExceeded,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// Diagnostic view of a license for the admin info endpoint.
#[derive(Debug, Serialize)]
pub struct LicenseDiagnostics {
    #[serde(flatten)]
    pub license: License,
    pub remaining_requests: i64,
    pub expired: bool,
    /// Failed validation attempts recorded for the license's last-used IP
    pub failed_attempts_from_last_ip: i64,
}

#[derive(Clone)]
pub struct LicenseService {
    pool: DbPool,
    default_request_limit: i64,
}

impl LicenseService {
    pub fn new(pool: DbPool, default_request_limit: i64) -> Self {
        Self {
            pool,
            default_request_limit,
        }
    }

    /// Issue a new license. `valid_until` is mandatory; `request_limit`
    /// defaults from configuration.
    pub fn create(&self, admin_id: &str, input: &CreateLicense) -> Result<License> {
        let valid_until = input
            .valid_until
            .ok_or_else(|| AppError::Validation("valid_until is required".into()))?;

        if input.license_type.trim().is_empty() {
            return Err(AppError::Validation("type must not be empty".into()));
        }

        check_hwid_bounds(&input.hwids)?;

        let request_limit = input.request_limit.unwrap_or(self.default_request_limit);
        if request_limit < 0 {
            return Err(AppError::Validation("request_limit must not be negative".into()));
        }

        let conn = self.pool.get()?;
        queries::create_license(
            &conn,
            admin_id,
            &input.license_type,
            input.user_id.as_deref(),
            &input.hwids,
            request_limit,
            valid_until,
        )
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<License>> {
        let conn = self.pool.get()?;
        queries::get_license_by_id(&conn, id)
    }

    pub fn find_by_key(&self, key: &str) -> Result<Option<License>> {
        let conn = self.pool.get()?;
        queries::get_license_by_key(&conn, key)
    }

    pub fn find_by_user(&self, user_id: &str) -> Result<Vec<License>> {
        let conn = self.pool.get()?;
        queries::list_licenses_by_user(&conn, user_id)
    }

    pub fn list(&self, limit: i64, offset: i64) -> Result<(Vec<License>, i64)> {
        let conn = self.pool.get()?;
        queries::list_licenses_paginated(&conn, limit, offset)
    }

    /// Admin mutation. Device binding happens only here, never during
    /// validation.
    pub fn update(&self, id: &str, patch: &UpdateLicense) -> Result<Option<License>> {
        if let Some(ref hwids) = patch.hwids {
            check_hwid_bounds(hwids)?;
        }
        if let Some(request_limit) = patch.request_limit {
            if request_limit < 0 {
                return Err(AppError::Validation("request_limit must not be negative".into()));
            }
        }

        let conn = self.pool.get()?;
        queries::update_license(&conn, id, patch)
    }

    /// Revocation. Terminal: the record is removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        queries::delete_license(&conn, id)
    }

    /// Atomically bump `request_count` and return the updated record.
    pub fn increment_usage(&self, id: &str) -> Result<Option<License>> {
        let conn = self.pool.get()?;
        queries::increment_license_usage(&conn, id)
    }

    /// The core gating decision.
    ///
    /// Checks run in a fixed order and fail closed: unknown key, expiry,
    /// device binding, then quota. The quota step is one conditional update
    /// at the store layer, so concurrent validations cannot overrun the
    /// limit; with `request_limit = N`, calls 1..N-1 succeed and call N
    /// fails (post-increment strict compare).
    pub fn validate(&self, key: &str, hwid: &str, ip: &str) -> Result<ValidationOutcome> {
        let conn = self.pool.get()?;
        let now = Utc::now().timestamp();

        let Some(license) = queries::get_license_by_key(&conn, key)? else {
            record_failure(&conn, ip);
            return Ok(ValidationOutcome::UnknownKey);
        };

        if license.is_expired(now) {
            record_failure(&conn, ip);
            return Ok(ValidationOutcome::Expired);
        }

        if !license.accepts_device(hwid) {
            record_failure(&conn, ip);
            return Ok(ValidationOutcome::DeviceMismatch);
        }

        if queries::consume_license_use(&conn, &license.id, ip)? {
            Ok(ValidationOutcome::Valid)
        } else {
            record_failure(&conn, ip);
            Ok(ValidationOutcome::QuotaExceeded)
        }
    }

    pub fn diagnostics(&self, id: &str) -> Result<Option<LicenseDiagnostics>> {
        let conn = self.pool.get()?;

        let Some(license) = queries::get_license_by_id(&conn, id)? else {
            return Ok(None);
        };

        let failed_attempts_from_last_ip = match license.last_used_ip {
            Some(ref ip) => queries::count_failed_attempts(&conn, ip)?,
            None => 0,
        };

        Ok(Some(LicenseDiagnostics {
            remaining_requests: license.remaining_requests(),
            expired: license.is_expired(Utc::now().timestamp()),
            failed_attempts_from_last_ip,
            license,
        }))
    }
}

fn check_hwid_bounds(hwids: &[String]) -> Result<()> {
    if hwids.len() > MAX_HWID_BINDINGS {
        return Err(AppError::Validation(format!(
            "at most {} device bindings per license",
            MAX_HWID_BINDINGS
        )));
    }
    if hwids.iter().any(|h| h.trim().is_empty()) {
        return Err(AppError::Validation("device identifiers must not be empty".into()));
    }
    Ok(())
}

/// Diagnostics write; never turns a validation into a 500.
fn record_failure(conn: &rusqlite::Connection, ip: &str) {
    if let Err(e) = queries::record_failed_attempt(conn, ip) {
        tracing::debug!("Failed to record failed attempt for {}: {}", ip, e);
    }
}
