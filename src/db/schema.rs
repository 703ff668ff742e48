use rusqlite::Connection;

/// Initialize the database schema.
///
/// There is no status column on licenses and no sweep job for blocked IPs:
/// expiry and quota exhaustion are computed lazily at lookup time.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Subjects (dashboard users / bot operators) - source of truth for roles
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL CHECK (role IN ('owner', 'administrator', 'customer', 'developer')),
            created_at INTEGER NOT NULL
        );

        -- Licenses. hwids is a JSON array of bound device identifiers.
        CREATE TABLE IF NOT EXISTS licenses (
            id TEXT PRIMARY KEY,
            key TEXT NOT NULL UNIQUE,
            type TEXT NOT NULL,
            user_id TEXT,
            admin_id TEXT NOT NULL,
            hwids TEXT NOT NULL DEFAULT '[]',
            request_limit INTEGER NOT NULL,
            request_count INTEGER NOT NULL DEFAULT 0,
            valid_until INTEGER NOT NULL,
            last_used_ip TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_licenses_user ON licenses(user_id);

        -- At most one block per address; re-blocking upserts reason/expiry
        CREATE TABLE IF NOT EXISTS blocked_ips (
            ip_address TEXT PRIMARY KEY,
            reason TEXT,
            blocked_by TEXT NOT NULL,
            blocked_at INTEGER NOT NULL,
            expires_at INTEGER
        );

        -- Append-only diagnostics log
        CREATE TABLE IF NOT EXISTS failed_attempts (
            id TEXT PRIMARY KEY,
            ip_address TEXT NOT NULL,
            attempted_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_failed_attempts_ip ON failed_attempts(ip_address);
        "#,
    )?;
    Ok(())
}
