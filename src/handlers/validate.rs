use axum::extract::{Extension, State};
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::response::Envelope;
use crate::util::ClientIp;

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub key: String,
    pub hwid: String,
}

/// No failure reason is ever included - a bare boolean prevents callers
/// from probing which check rejected them.
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// POST /validate - service-to-service license check. Unauthenticated;
/// every successful call consumes one use of the license.
pub async fn validate_license(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Json(req): Json<ValidateRequest>,
) -> Result<Envelope<ValidateResponse>> {
    let outcome = state.licenses.validate(&req.key, &req.hwid, &ip)?;

    Ok(Envelope(ValidateResponse {
        valid: outcome.is_valid(),
    }))
}
