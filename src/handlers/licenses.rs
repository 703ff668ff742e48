use axum::extract::{Extension, State};

use crate::db::AppState;
use crate::error::{AppError, OptionExt, Result};
use crate::extractors::{Json, Path, Query};
use crate::licenses::LicenseDiagnostics;
use crate::middleware::Actor;
use crate::models::{CreateLicense, License, Role, UpdateLicense};
use crate::pagination::{Paginated, PaginationQuery};
use crate::response::{Created, Envelope, NoContent};

/// POST /licenses - issue a license. Administrator only; `valid_until` is
/// mandatory.
pub async fn create_license(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(input): Json<CreateLicense>,
) -> Result<Created<License>> {
    actor.require_role(Role::Administrator)?;

    let license = state.licenses.create(actor.id(), &input)?;
    Ok(Created(license))
}

/// GET /licenses - paginated listing, any authenticated subject.
pub async fn list_licenses(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Envelope<Paginated<License>>> {
    let limit = query.limit();
    let offset = query.offset();
    let (licenses, total) = state.licenses.list(limit, offset)?;

    Ok(Envelope(Paginated::new(licenses, total, limit, offset)))
}

/// GET /licenses/{id}
pub async fn get_license(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<License>> {
    let license = state.licenses.find_by_id(&id)?.or_not_found("license")?;
    Ok(Envelope(license))
}

/// GET /licenses/user/{user_id}
pub async fn licenses_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Envelope<Vec<License>>> {
    let licenses = state.licenses.find_by_user(&user_id)?;
    Ok(Envelope(licenses))
}

/// GET /licenses/{id}/info - diagnostic view with usage stats. Administrator
/// only; this endpoint reveals more than the public validate ever does.
pub async fn license_info(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Envelope<LicenseDiagnostics>> {
    actor.require_role(Role::Administrator)?;

    let diagnostics = state.licenses.diagnostics(&id)?.or_not_found("license")?;
    Ok(Envelope(diagnostics))
}

/// PUT /licenses/{id} - admin mutation of device bindings, quota, expiry.
pub async fn update_license(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(patch): Json<UpdateLicense>,
) -> Result<Envelope<License>> {
    actor.require_role(Role::Administrator)?;

    let license = state.licenses.update(&id, &patch)?.or_not_found("license")?;
    Ok(Envelope(license))
}

/// DELETE /licenses/{id} - revocation; the only persisted terminal
/// transition a license has.
pub async fn delete_license(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<NoContent> {
    actor.require_role(Role::Administrator)?;

    if !state.licenses.delete(&id)? {
        return Err(AppError::NotFound("license".into()));
    }

    Ok(NoContent)
}
