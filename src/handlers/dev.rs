//! Dev-mode-only endpoints, mounted when KEYGATE_ENV=dev. Never part of the
//! production surface.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{AppError, OptionExt, Result};
use crate::extractors::Json;
use crate::models::{CreateLicense, License};
use crate::response::{Created, Envelope};

#[derive(Debug, Deserialize)]
pub struct DevTokenRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct DevTokenResponse {
    pub token: String,
}

/// POST /dev/token - mint a one-hour token for a seeded subject.
pub async fn create_dev_token(
    State(state): State<AppState>,
    Json(req): Json<DevTokenRequest>,
) -> Result<Envelope<DevTokenResponse>> {
    let signer = state
        .dev_signer
        .as_ref()
        .ok_or_else(|| AppError::Internal("dev signer not configured".into()))?;

    let conn = state.db.get()?;
    let user = queries::get_user_by_username(&conn, &req.username)?.or_not_found("user")?;

    let token = signer.sign(&user.id, user.role, 3600)?;
    Ok(Envelope(DevTokenResponse { token }))
}

/// POST /dev/licenses - create a license without going through admin auth.
pub async fn create_dev_license(
    State(state): State<AppState>,
    Json(input): Json<CreateLicense>,
) -> Result<Created<License>> {
    let license = state.licenses.create("dev", &input)?;
    Ok(Created(license))
}
