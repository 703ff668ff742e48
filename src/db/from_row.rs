//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, username, role, created_at";

pub const LICENSE_COLS: &str = "id, key, type, user_id, admin_id, hwids, request_limit, request_count, valid_until, last_used_ip, created_at";

pub const BLOCKED_IP_COLS: &str = "ip_address, reason, blocked_by, blocked_at, expires_at";

// ============ FromRow Implementations ============

/// Parse a text column into a typed value, converting parse failures into
/// rusqlite errors instead of panicking on corrupt rows.
fn invalid_column(col: usize, name: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(col, name.to_string(), rusqlite::types::Type::Text)
}

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let role: String = row.get(2)?;
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            role: Role::parse(&role).ok_or_else(|| invalid_column(2, "role"))?,
            created_at: row.get(3)?,
        })
    }
}

impl FromRow for License {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let hwids_json: String = row.get(5)?;
        let hwids: Vec<String> =
            serde_json::from_str(&hwids_json).map_err(|_| invalid_column(5, "hwids"))?;
        Ok(License {
            id: row.get(0)?,
            key: row.get(1)?,
            license_type: row.get(2)?,
            user_id: row.get(3)?,
            admin_id: row.get(4)?,
            hwids,
            request_limit: row.get(6)?,
            request_count: row.get(7)?,
            valid_until: row.get(8)?,
            last_used_ip: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

impl FromRow for BlockedIp {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(BlockedIp {
            ip_address: row.get(0)?,
            reason: row.get(1)?,
            blocked_by: row.get(2)?,
            blocked_at: row.get(3)?,
            expires_at: row.get(4)?,
        })
    }
}
