use axum::extract::{Extension, State};
use serde::Serialize;

use crate::db::AppState;
use crate::error::{OptionExt, Result};
use crate::middleware::LicenseContext;
use crate::response::Envelope;

#[derive(Debug, Serialize)]
pub struct EntitlementsResponse {
    pub tier: String,
    pub remaining_requests: i64,
    pub valid_until: i64,
}

/// GET /api/entitlements - the license-scoped sample surface. The license
/// gate has already validated (and consumed a use of) the presented key;
/// this just reports what the caller is entitled to.
pub async fn entitlements(
    State(state): State<AppState>,
    Extension(license): Extension<LicenseContext>,
) -> Result<Envelope<EntitlementsResponse>> {
    let license = state.licenses.find_by_key(&license.key)?.or_not_found("license")?;

    Ok(Envelope(EntitlementsResponse {
        tier: license.license_type.clone(),
        remaining_requests: license.remaining_requests(),
        valid_until: license.valid_until,
    }))
}
