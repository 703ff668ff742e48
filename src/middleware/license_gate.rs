//! License gate for license-scoped routes.
//!
//! Runs the full validation ladder (key lookup, expiry, device binding,
//! atomic quota consume) against credentials presented in headers. Each
//! passing request consumes one use of the license, even when the caller
//! disconnects before the response is written.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::licenses::ValidationOutcome;
use crate::util::client_ip;

pub const LICENSE_KEY_HEADER: &str = "x-license-key";
pub const DEVICE_ID_HEADER: &str = "x-device-id";

/// Credentials that passed the gate, attached for the business handler.
#[derive(Debug, Clone)]
pub struct LicenseContext {
    pub key: String,
    pub hwid: String,
}

pub async fn license_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let key = header_value(&request, LICENSE_KEY_HEADER)
        .ok_or_else(|| AppError::Forbidden("missing license key".into()))?;
    let hwid = header_value(&request, DEVICE_ID_HEADER)
        .ok_or_else(|| AppError::Forbidden("missing device identifier".into()))?;
    let ip = client_ip(&request);

    match state.licenses.validate(&key, &hwid, &ip)? {
        ValidationOutcome::Valid => {
            request.extensions_mut().insert(LicenseContext { key, hwid });
            Ok(next.run(request).await)
        }
        ValidationOutcome::UnknownKey => Err(AppError::Forbidden("unknown license key".into())),
        ValidationOutcome::Expired => Err(AppError::ExpiredLicense),
        ValidationOutcome::DeviceMismatch => Err(AppError::DeviceMismatch),
        ValidationOutcome::QuotaExceeded => Err(AppError::QuotaExceeded),
    }
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
