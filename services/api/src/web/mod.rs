pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::require_student;
pub use state::AppState;

/// Every API route behind the identity middleware, with state applied.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/quizzes/{id}/sessions", post(rest::start_quiz_session_handler))
        .route("/quizzes/{id}/status", get(rest::quiz_status_handler))
        .route("/quizzes/{id}/prerequisite", put(rest::set_quiz_prerequisite_handler))
        .route("/modules/{id}/status", get(rest::module_status_handler))
        .route("/modules/{id}/prerequisite", put(rest::set_module_prerequisite_handler))
        .route("/classrooms/{id}/leitner/sessions", post(rest::start_leitner_session_handler))
        .route("/classrooms/{id}/leitner/status", get(rest::leitner_status_handler))
        .route("/sessions/{id}/answers", post(rest::submit_answer_handler))
        .route("/sessions/{id}/finish", post(rest::finish_session_handler))
        .route("/sessions/{id}/review", get(rest::review_session_handler))
        .layer(axum_middleware::from_fn(require_student))
        .with_state(state)
}
