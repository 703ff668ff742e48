//! Role gate / authenticator stage.
//!
//! Two parallel strategies behind one `Authenticator` value: a verified
//! bearer token with a role requirement, or a shared-secret header for
//! trusted collaborator processes. Routes attach exactly one.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::models::{Role, Subject};
use crate::util::extract_bearer_token;

/// Who is acting on a request, attached to the request extensions once the
/// auth stage passes.
#[derive(Debug, Clone)]
pub enum Actor {
    Subject(Subject),
    /// Shared-secret collaborator; not a per-user subject
    Service,
}

impl Actor {
    /// Identifier recorded as issuer/attribution on mutations.
    pub fn id(&self) -> &str {
        match self {
            Actor::Subject(subject) => &subject.id,
            Actor::Service => "service",
        }
    }

    /// Role check for handlers whose group-level authenticator admits any
    /// subject. The shared-secret collaborator passes every check.
    pub fn require_role(&self, required: Role) -> Result<()> {
        match self {
            Actor::Service => Ok(()),
            Actor::Subject(subject) if subject.role.satisfies(required) => Ok(()),
            Actor::Subject(_) => Err(AppError::Forbidden(format!(
                "requires {} role",
                required.as_str()
            ))),
        }
    }
}

/// Per-route authorization strategy.
#[derive(Debug, Clone)]
pub enum Authenticator {
    /// Bearer token; `required = None` admits any authenticated subject.
    Token { required: Option<Role> },
    /// Shared-secret header, compared in constant time.
    SharedSecret,
}

impl Authenticator {
    pub fn authenticated() -> Self {
        Authenticator::Token { required: None }
    }

    pub fn role(required: Role) -> Self {
        Authenticator::Token {
            required: Some(required),
        }
    }

    pub fn shared_secret() -> Self {
        Authenticator::SharedSecret
    }
}

/// The auth stage. Fails closed and short-circuits; on success the resolved
/// `Actor` is attached for handlers to read.
pub async fn authorize(
    State((state, authenticator)): State<(AppState, Authenticator)>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let actor = match authenticator {
        Authenticator::Token { required } => {
            let subject = authenticate_token(&state, request.headers(), required)?;
            Actor::Subject(subject)
        }
        Authenticator::SharedSecret => {
            verify_shared_secret(&state, request.headers())?;
            Actor::Service
        }
    };

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

/// Verify the bearer token, then load the subject's persisted role. The
/// role inside the token is a hint only; the store is authoritative.
fn authenticate_token(
    state: &AppState,
    headers: &HeaderMap,
    required: Option<Role>,
) -> Result<Subject> {
    let token =
        extract_bearer_token(headers).ok_or(AppError::Unauthorized("missing bearer token"))?;

    let verified = state.verifier.verify(token)?;

    let conn = state.db.get()?;
    let user = queries::get_user_by_id(&conn, &verified.subject_id)?
        .ok_or(AppError::Unauthorized("unknown subject"))?;

    if let Some(required) = required {
        if !user.role.satisfies(required) {
            return Err(AppError::Forbidden(format!(
                "requires {} role",
                required.as_str()
            )));
        }
    }

    Ok(Subject {
        id: user.id,
        role: user.role,
    })
}

/// Compare the named header against the configured secret in constant time.
/// Any mismatch, including a missing or empty header, is a 403.
fn verify_shared_secret(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let Some(ref expected) = state.service_secret else {
        tracing::warn!("Shared-secret auth attempted but no secret is configured");
        return Err(AppError::Forbidden("invalid service secret".into()));
    };

    let presented = headers
        .get(state.service_secret_header.as_str())
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    // Length check is not constant-time, but that's fine - the secret's
    // length is not secret.
    if presented.is_empty() || presented.len() != expected.len() {
        return Err(AppError::Forbidden("invalid service secret".into()));
    }

    let matches: bool = expected
        .as_bytes()
        .ct_eq(presented.as_bytes())
        .into();

    if matches {
        Ok(())
    } else {
        Err(AppError::Forbidden("invalid service secret".into()))
    }
}
