//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::debug;
use uuid::Uuid;

/// The header the upstream authentication layer sets for every request.
pub const STUDENT_ID_HEADER: &str = "x-student-id";

/// The authenticated caller, as placed in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentId(pub Uuid);

/// Middleware that resolves the caller's identity from the `x-student-id` header.
///
/// If valid, inserts a [`StudentId`] into request extensions for handlers to use.
/// If missing or malformed, returns 401 Unauthorized.
pub async fn require_student(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let student_id = req
        .headers()
        .get(STUDENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| {
            debug!("Rejected request without a valid {} header", STUDENT_ID_HEADER);
            StatusCode::UNAUTHORIZED
        })?;

    req.extensions_mut().insert(StudentId(student_id));
    Ok(next.run(req).await)
}
