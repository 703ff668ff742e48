use std::net::IpAddr;

use axum::extract::{Extension, State};

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::middleware::Actor;
use crate::models::{BlockIpRequest, BlockedIp, BlockedIpEntry, Role};
use crate::pagination::{Paginated, PaginationQuery};
use crate::response::{Created, Envelope, NoContent};

/// POST /blocklist (admin) and POST /internal/blocklist (automated abuse
/// signal from the bot process). Re-blocking refreshes reason/expiry.
pub async fn block_ip(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<BlockIpRequest>,
) -> Result<Created<BlockedIp>> {
    actor.require_role(Role::Administrator)?;

    if req.ip_address.parse::<IpAddr>().is_err() {
        return Err(AppError::Validation(format!(
            "not a valid IP address: {}",
            req.ip_address
        )));
    }

    let block = state.blocklist.block_ip(
        &req.ip_address,
        actor.id(),
        req.reason.as_deref(),
        req.expires_at,
    )?;

    Ok(Created(block))
}

/// DELETE /blocklist/{ip} and DELETE /internal/blocklist/{ip}
pub async fn unblock_ip(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(ip): Path<String>,
) -> Result<NoContent> {
    actor.require_role(Role::Administrator)?;

    if !state.blocklist.unblock_ip(&ip)? {
        return Err(AppError::NotFound(format!("no block for {}", ip)));
    }

    Ok(NoContent)
}

/// GET /blocklist
pub async fn list_blocked(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<PaginationQuery>,
) -> Result<Envelope<Paginated<BlockedIpEntry>>> {
    actor.require_role(Role::Administrator)?;

    let limit = query.limit();
    let offset = query.offset();
    let (entries, total) = state.blocklist.list(limit, offset)?;

    Ok(Envelope(Paginated::new(entries, total, limit, offset)))
}
