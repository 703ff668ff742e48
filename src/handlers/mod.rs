mod blocklist;
pub mod dev;
mod entitlements;
mod licenses;
mod validate;

pub use blocklist::*;
pub use entitlements::*;
pub use licenses::*;
pub use validate::*;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;

use crate::db::AppState;
use crate::middleware::{authorize, ip_blocklist, license_gate, Authenticator};
use crate::models::Role;
use crate::rate_limit::{rate_limit, RateLimiters};
use crate::response::Envelope;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Envelope<HealthResponse> {
    Envelope(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the gated router.
///
/// Each group declares its pipeline in reverse: `.layer` wraps everything
/// added before it, so the rate limiter is added last to run first, giving
/// the order rate limiter -> blocklist -> authenticator -> handler.
pub fn router(state: AppState, limiters: &RateLimiters) -> Router<AppState> {
    // Public status surface
    let public = Router::new()
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), ip_blocklist))
        .layer(middleware::from_fn_with_state(
            limiters.relaxed.clone(),
            rate_limit,
        ));

    // Service-to-service validation; unauthenticated by design
    let validate = Router::new()
        .route("/validate", post(validate_license))
        .layer(middleware::from_fn_with_state(state.clone(), ip_blocklist))
        .layer(middleware::from_fn_with_state(
            limiters.standard.clone(),
            rate_limit,
        ));

    // License management. The group authenticator admits any subject;
    // mutating handlers demand the administrator role themselves.
    let licenses_api = Router::new()
        .route("/licenses", post(create_license).get(list_licenses))
        .route(
            "/licenses/{id}",
            get(get_license).put(update_license).delete(delete_license),
        )
        .route("/licenses/{id}/info", get(license_info))
        .route("/licenses/user/{user_id}", get(licenses_by_user))
        .layer(middleware::from_fn_with_state(
            (state.clone(), Authenticator::authenticated()),
            authorize,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), ip_blocklist))
        .layer(middleware::from_fn_with_state(
            limiters.standard.clone(),
            rate_limit,
        ));

    // Blocklist administration
    let blocklist_api = Router::new()
        .route("/blocklist", post(block_ip).get(list_blocked))
        .route("/blocklist/{ip}", delete(unblock_ip))
        .layer(middleware::from_fn_with_state(
            (state.clone(), Authenticator::role(Role::Administrator)),
            authorize,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), ip_blocklist))
        .layer(middleware::from_fn_with_state(
            limiters.standard.clone(),
            rate_limit,
        ));

    // Internal surface for the bot process: shared secret instead of a
    // subject. No blocklist stage here - an automated abuse report must
    // not be vetoed by an existing block.
    let internal = Router::new()
        .route("/internal/blocklist", post(block_ip))
        .route("/internal/blocklist/{ip}", delete(unblock_ip))
        .layer(middleware::from_fn_with_state(
            (state.clone(), Authenticator::shared_secret()),
            authorize,
        ))
        .layer(middleware::from_fn_with_state(
            limiters.standard.clone(),
            rate_limit,
        ));

    // License-scoped sample surface: the license key is the credential
    let gated = Router::new()
        .route("/api/entitlements", get(entitlements))
        .layer(middleware::from_fn_with_state(state.clone(), license_gate))
        .layer(middleware::from_fn_with_state(state.clone(), ip_blocklist))
        .layer(middleware::from_fn_with_state(
            limiters.strict.clone(),
            rate_limit,
        ));

    public
        .merge(validate)
        .merge(licenses_api)
        .merge(blocklist_api)
        .merge(internal)
        .merge(gated)
}
