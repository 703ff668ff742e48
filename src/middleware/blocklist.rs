//! IP blocklist stage.
//!
//! Runs before authentication: a blocked address is rejected even with a
//! valid token. This is the one stage that fails OPEN on a store fault -
//! a storage outage must not take the entire gated surface down with it.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::util::{client_ip, ClientIp};

pub async fn ip_blocklist(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let ip = client_ip(&request);
    request.extensions_mut().insert(ClientIp(ip.clone()));

    match state.blocklist.is_blocked(&ip) {
        Ok(true) => {
            tracing::info!("Rejected request from blocked IP {}", ip);
            Err(AppError::Blocked)
        }
        Ok(false) => Ok(next.run(request).await),
        Err(e) => {
            tracing::warn!("Blocklist check failed for {}: {}; allowing request", ip, e);
            Ok(next.run(request).await)
        }
    }
}
