use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{query_all, query_one, FromRow, BLOCKED_IP_COLS, LICENSE_COLS, USER_COLS};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Users ============

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let user = User {
        id: gen_id(),
        username: input.username.clone(),
        role: input.role,
        created_at: now(),
    };

    conn.execute(
        "INSERT INTO users (id, username, role, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![&user.id, &user.username, user.role.as_str(), user.created_at],
    )?;

    Ok(user)
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE username = ?1", USER_COLS),
        &[&username],
    )
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .map_err(Into::into)
}

// ============ Licenses ============

/// Generate a license key with the KG- brand prefix.
pub fn generate_license_key() -> String {
    format!("KG-{}", Uuid::new_v4().to_string().replace('-', "").to_uppercase())
}

#[allow(clippy::too_many_arguments)]
pub fn create_license(
    conn: &Connection,
    admin_id: &str,
    license_type: &str,
    user_id: Option<&str>,
    hwids: &[String],
    request_limit: i64,
    valid_until: i64,
) -> Result<License> {
    let license = License {
        id: gen_id(),
        key: generate_license_key(),
        license_type: license_type.to_string(),
        user_id: user_id.map(String::from),
        admin_id: admin_id.to_string(),
        hwids: hwids.to_vec(),
        request_limit,
        request_count: 0,
        valid_until,
        last_used_ip: None,
        created_at: now(),
    };

    conn.execute(
        "INSERT INTO licenses (id, key, type, user_id, admin_id, hwids, request_limit, request_count, valid_until, last_used_ip, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, NULL, ?9)",
        params![
            &license.id,
            &license.key,
            &license.license_type,
            &license.user_id,
            &license.admin_id,
            serde_json::to_string(&license.hwids)?,
            license.request_limit,
            license.valid_until,
            license.created_at,
        ],
    )?;

    Ok(license)
}

pub fn get_license_by_id(conn: &Connection, id: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE id = ?1", LICENSE_COLS),
        &[&id],
    )
}

pub fn get_license_by_key(conn: &Connection, key: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE key = ?1", LICENSE_COLS),
        &[&key],
    )
}

pub fn list_licenses_by_user(conn: &Connection, user_id: &str) -> Result<Vec<License>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE user_id = ?1 ORDER BY created_at DESC",
            LICENSE_COLS
        ),
        &[&user_id],
    )
}

pub fn list_licenses_paginated(
    conn: &Connection,
    limit: i64,
    offset: i64,
) -> Result<(Vec<License>, i64)> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM licenses", [], |row| row.get(0))?;

    let items = query_all(
        conn,
        &format!(
            "SELECT {} FROM licenses ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
            LICENSE_COLS
        ),
        &[&limit, &offset],
    )?;

    Ok((items, total))
}

/// Update a license's mutable fields. Returns the updated license, or None
/// if it does not exist (or nothing was set).
pub fn update_license(
    conn: &Connection,
    id: &str,
    patch: &UpdateLicense,
) -> Result<Option<License>> {
    let mut sets: Vec<&'static str> = Vec::new();
    let mut values: Vec<rusqlite::types::Value> = Vec::new();

    if let Some(ref license_type) = patch.license_type {
        sets.push("type = ?");
        values.push(license_type.clone().into());
    }
    if let Some(ref user_id) = patch.user_id {
        sets.push("user_id = ?");
        values.push(user_id.clone().into());
    }
    if let Some(ref hwids) = patch.hwids {
        sets.push("hwids = ?");
        values.push(serde_json::to_string(hwids)?.into());
    }
    if let Some(request_limit) = patch.request_limit {
        sets.push("request_limit = ?");
        values.push(request_limit.into());
    }
    if let Some(valid_until) = patch.valid_until {
        sets.push("valid_until = ?");
        values.push(valid_until.into());
    }

    if sets.is_empty() {
        return get_license_by_id(conn, id);
    }

    values.push(id.to_string().into());
    let sql = format!(
        "UPDATE licenses SET {} WHERE id = ? RETURNING {}",
        sets.join(", "),
        LICENSE_COLS
    );

    conn.query_row(
        &sql,
        rusqlite::params_from_iter(values),
        <License as FromRow>::from_row,
    )
    .optional()
    .map_err(Into::into)
}

pub fn delete_license(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM licenses WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Unconditionally increment `request_count` and return the updated license.
pub fn increment_license_usage(conn: &Connection, id: &str) -> Result<Option<License>> {
    conn.query_row(
        &format!(
            "UPDATE licenses SET request_count = request_count + 1 WHERE id = ?1 RETURNING {}",
            LICENSE_COLS
        ),
        params![id],
        <License as FromRow>::from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Consume one use of a license: a single conditional update so the
/// increment-then-compare is atomic at the store layer. Returns true when
/// the use was granted, i.e. the post-increment count is still strictly
/// below `request_limit` (a limit of N admits N-1 calls; the counter never
/// passes N-1).
pub fn consume_license_use(conn: &Connection, id: &str, ip: &str) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE licenses
         SET request_count = request_count + 1, last_used_ip = ?2
         WHERE id = ?1 AND request_count + 1 < request_limit",
        params![id, ip],
    )?;
    Ok(updated > 0)
}

// ============ Blocked IPs ============

/// Block an address, or refresh reason/expiry when it is already blocked.
pub fn upsert_blocked_ip(
    conn: &Connection,
    ip_address: &str,
    blocked_by: &str,
    reason: Option<&str>,
    expires_at: Option<i64>,
) -> Result<BlockedIp> {
    let block = BlockedIp {
        ip_address: ip_address.to_string(),
        reason: reason.map(String::from),
        blocked_by: blocked_by.to_string(),
        blocked_at: now(),
        expires_at,
    };

    conn.execute(
        "INSERT INTO blocked_ips (ip_address, reason, blocked_by, blocked_at, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(ip_address) DO UPDATE SET
             reason = excluded.reason,
             blocked_by = excluded.blocked_by,
             blocked_at = excluded.blocked_at,
             expires_at = excluded.expires_at",
        params![
            &block.ip_address,
            &block.reason,
            &block.blocked_by,
            block.blocked_at,
            block.expires_at,
        ],
    )?;

    Ok(block)
}

pub fn get_blocked_ip(conn: &Connection, ip_address: &str) -> Result<Option<BlockedIp>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM blocked_ips WHERE ip_address = ?1",
            BLOCKED_IP_COLS
        ),
        &[&ip_address],
    )
}

pub fn delete_blocked_ip(conn: &Connection, ip_address: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM blocked_ips WHERE ip_address = ?1",
        params![ip_address],
    )?;
    Ok(deleted > 0)
}

pub fn list_blocked_ips_paginated(
    conn: &Connection,
    limit: i64,
    offset: i64,
) -> Result<(Vec<BlockedIp>, i64)> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM blocked_ips", [], |row| row.get(0))?;

    let items = query_all(
        conn,
        &format!(
            "SELECT {} FROM blocked_ips ORDER BY blocked_at DESC LIMIT ?1 OFFSET ?2",
            BLOCKED_IP_COLS
        ),
        &[&limit, &offset],
    )?;

    Ok((items, total))
}

// ============ Failed Attempts ============

pub fn record_failed_attempt(conn: &Connection, ip_address: &str) -> Result<FailedAttempt> {
    let attempt = FailedAttempt {
        id: gen_id(),
        ip_address: ip_address.to_string(),
        attempted_at: now(),
    };

    conn.execute(
        "INSERT INTO failed_attempts (id, ip_address, attempted_at) VALUES (?1, ?2, ?3)",
        params![&attempt.id, &attempt.ip_address, attempt.attempted_at],
    )?;

    Ok(attempt)
}

pub fn count_failed_attempts(conn: &Connection, ip_address: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM failed_attempts WHERE ip_address = ?1",
        params![ip_address],
        |row| row.get(0),
    )
    .map_err(Into::into)
}
