//! Success half of the response envelope.
//!
//! Every successful JSON response is `{"success": true, "data": ...}`;
//! failures are produced by `AppError::into_response`. Deletions return
//! 204 with no body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
struct SuccessBody<T> {
    success: bool,
    data: T,
}

/// 200 OK envelope wrapper.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<T>(pub T);

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(SuccessBody {
            success: true,
            data: self.0,
        })
        .into_response()
    }
}

/// 201 Created envelope wrapper.
#[derive(Debug, Clone, Copy)]
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (
            StatusCode::CREATED,
            Json(SuccessBody {
                success: true,
                data: self.0,
            }),
        )
            .into_response()
    }
}

/// 204 No Content (deletions).
#[derive(Debug, Clone, Copy)]
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}
