//! IP blocklist: admin CRUD plus the per-request block decision.
//!
//! Expired blocks stay in the store and are treated as inactive at lookup
//! time, the same lazy-expiry posture licenses use. The service reports
//! store faults to its callers; the gateway middleware is the one place
//! that converts a fault into an allow (fail open) instead of a deny.

use chrono::Utc;

use crate::db::{queries, DbPool};
use crate::error::Result;
use crate::models::{BlockedIp, BlockedIpEntry};

#[derive(Clone)]
pub struct BlocklistService {
    pool: DbPool,
}

impl BlocklistService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Block an address. Re-blocking an already-blocked address refreshes
    /// reason and expiry instead of erroring.
    pub fn block_ip(
        &self,
        ip_address: &str,
        blocked_by: &str,
        reason: Option<&str>,
        expires_at: Option<i64>,
    ) -> Result<BlockedIp> {
        let conn = self.pool.get()?;
        let block = queries::upsert_blocked_ip(&conn, ip_address, blocked_by, reason, expires_at)?;
        tracing::info!("Blocked IP {} (by {})", ip_address, blocked_by);
        Ok(block)
    }

    /// Remove a block. Returns false when nothing was blocked.
    pub fn unblock_ip(&self, ip_address: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let removed = queries::delete_blocked_ip(&conn, ip_address)?;
        if removed {
            tracing::info!("Unblocked IP {}", ip_address);
        }
        Ok(removed)
    }

    /// Whether the address is currently blocked: a record exists and its
    /// expiry (if any) is still in the future.
    pub fn is_blocked(&self, ip_address: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let now = Utc::now().timestamp();
        Ok(queries::get_blocked_ip(&conn, ip_address)?
            .map(|block| block.is_active(now))
            .unwrap_or(false))
    }

    pub fn list(&self, limit: i64, offset: i64) -> Result<(Vec<BlockedIpEntry>, i64)> {
        let conn = self.pool.get()?;
        let now = Utc::now().timestamp();
        let (blocks, total) = queries::list_blocked_ips_paginated(&conn, limit, offset)?;

        let entries = blocks
            .into_iter()
            .map(|block| BlockedIpEntry {
                active: block.is_active(now),
                block,
            })
            .collect();

        Ok((entries, total))
    }
}
