//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification. Handlers are thin: they resolve
//! the caller, call one engine operation, and shape the result.

use crate::web::middleware::StudentId;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use progression_core::domain::{ClickPoint, QuestionBody};
use progression_core::{
    BoxStatus, ErrorKind, ModuleStatus, ProgressionError, Question, QuizStatus, Session,
    SessionKind, SessionOutcome, SessionReview, StartedSession, SubmittedAnswer,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        start_quiz_session_handler,
        start_leitner_session_handler,
        leitner_status_handler,
        submit_answer_handler,
        finish_session_handler,
        review_session_handler,
        set_quiz_prerequisite_handler,
        set_module_prerequisite_handler,
        quiz_status_handler,
        module_status_handler,
    ),
    components(
        schemas(
            StartLeitnerRequest,
            SubmitAnswerRequest,
            ClickPayload,
            SetPrerequisiteRequest,
            StartedSessionResponse,
            QuestionView,
            OptionView,
            AnswerResponse,
            OutcomeResponse,
            ReviewResponse,
            ReviewItemView,
            BoxStatusResponse,
            BoxView,
            QuizStatusResponse,
            ModuleStatusResponse,
        )
    ),
    tags(
        (name = "Learning Progression API", description = "Quiz sessions, Leitner reviews and prerequisite gating.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

type ApiResult<T> = Result<T, (StatusCode, String)>;

/// The HTTP status for an engine error.
pub fn status_for(err: &ProgressionError) -> StatusCode {
    match err.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidArgument | ErrorKind::ResourceExhausted => StatusCode::BAD_REQUEST,
        ErrorKind::PreconditionFailed => match err {
            ProgressionError::SessionNotFinished(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::CONFLICT,
        },
        ErrorKind::CircularDependency => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ProgressionError) -> (StatusCode, String) {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {:?}", err);
        return (status, "Internal server error".to_string());
    }
    (status, err.to_string())
}

//=========================================================================================
// API Request Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct StartLeitnerRequest {
    /// One of the configured session sizes (5, 10, 15 or 20 by default).
    #[schema(value_type = i64)]
    pub question_count: serde_json::Number,
}

impl StartLeitnerRequest {
    /// Negative, fractional and oversized counts are rejected like any other
    /// disallowed size, with a 400 rather than a body-shape error.
    fn requested_count(&self) -> ApiResult<u32> {
        self.question_count
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("{} is not an allowed question count", self.question_count),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct ClickPayload {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// An answer to one question. Only the field matching the question's type is read.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    pub question_id: Uuid,
    #[serde(default)]
    pub selected_option_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    pub selected_option_id: Option<Uuid>,
    #[serde(default)]
    pub pairs: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub clicked_coordinates: Option<ClickPayload>,
    #[serde(default)]
    pub text_answer: Option<String>,
}

impl SubmitAnswerRequest {
    fn into_parts(self) -> (Uuid, SubmittedAnswer) {
        let answer = SubmittedAnswer {
            selected_option_ids: self.selected_option_ids,
            selected_option_id: self.selected_option_id,
            pairs: self.pairs,
            clicked_coordinates: self.clicked_coordinates.map(|c| ClickPoint { x: c.x, y: c.y }),
            text_answer: self.text_answer,
        };
        (self.question_id, answer)
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SetPrerequisiteRequest {
    /// The new prerequisite, or `null` to clear it.
    pub prerequisite_id: Option<Uuid>,
}

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct OptionView {
    pub id: Uuid,
    pub text: String,
}

/// A question as shown to a student: no correct answers.
#[derive(Serialize, ToSchema)]
pub struct QuestionView {
    pub id: Uuid,
    pub question_type: String,
    pub content_text: String,
    pub media_ref: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_items: Option<Vec<String>>,
    /// Sorted, so the order reveals nothing about the pairing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_items: Option<Vec<String>>,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        let mut view = QuestionView {
            id: question.id,
            question_type: question.body.kind().as_str().to_string(),
            content_text: question.content_text.clone(),
            media_ref: question.media_ref,
            options: None,
            left_items: None,
            right_items: None,
        };
        match &question.body {
            QuestionBody::ChoiceSingle { options } | QuestionBody::ChoiceMulti { options } => {
                view.options = Some(
                    options.iter().map(|o| OptionView { id: o.id, text: o.text.clone() }).collect(),
                );
            }
            QuestionBody::Matching { pairs } => {
                view.left_items = Some(pairs.iter().map(|p| p.left_item.clone()).collect());
                let mut right: Vec<String> = pairs.iter().map(|p| p.right_item.clone()).collect();
                right.sort();
                view.right_items = Some(right);
            }
            QuestionBody::ImageZone { .. } | QuestionBody::Text(_) => {}
        }
        view
    }
}

#[derive(Serialize, ToSchema)]
pub struct StartedSessionResponse {
    pub session_id: Uuid,
    /// `standard` or `leitner`.
    pub kind: String,
    pub quiz_id: Option<Uuid>,
    pub requested_count: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub questions: Vec<QuestionView>,
    /// Selected questions per box, box 1 first (Leitner only).
    pub box_distribution: Option<Vec<u32>>,
}

fn kind_parts(session: &Session) -> (String, Option<Uuid>, Option<u32>) {
    match session.kind {
        SessionKind::Standard { quiz_id } => ("standard".to_string(), Some(quiz_id), None),
        SessionKind::Leitner { requested_count } => {
            ("leitner".to_string(), None, Some(requested_count))
        }
    }
}

impl From<StartedSession> for StartedSessionResponse {
    fn from(started: StartedSession) -> Self {
        let (kind, quiz_id, requested_count) = kind_parts(&started.session);
        Self {
            session_id: started.session.id,
            kind,
            quiz_id,
            requested_count,
            started_at: started.session.started_at,
            questions: started.questions.iter().map(QuestionView::from).collect(),
            box_distribution: started.box_distribution.map(|d| d.to_vec()),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AnswerResponse {
    pub is_correct: bool,
    pub previous_box: Option<u8>,
    /// The box the question moves to when the session finishes.
    pub new_box: Option<u8>,
}

#[derive(Serialize, ToSchema)]
pub struct OutcomeResponse {
    pub session_id: Uuid,
    pub score: u32,
    pub max_score: u32,
    pub answered: u32,
    pub correct: u32,
    pub wrong: u32,
    pub passed: bool,
    pub promoted: Option<u32>,
    pub demoted: Option<u32>,
}

impl OutcomeResponse {
    fn new(session_id: Uuid, outcome: SessionOutcome) -> Self {
        Self {
            session_id,
            score: outcome.score,
            max_score: outcome.max_score,
            answered: outcome.answered,
            correct: outcome.score,
            wrong: outcome.wrong(),
            passed: outcome.passed,
            promoted: outcome.box_movement.map(|m| m.promoted),
            demoted: outcome.box_movement.map(|m| m.demoted),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ReviewItemView {
    pub question_id: Uuid,
    pub question_type: String,
    pub content_text: String,
    pub explanation: Option<String>,
    pub media_ref: Option<Uuid>,
    /// `null` when the question was left unanswered.
    pub is_correct: Option<bool>,
    #[schema(value_type = Object)]
    pub submitted: Option<serde_json::Value>,
    /// The full question payload, correct answers included.
    #[schema(value_type = Object)]
    pub correct_answer: serde_json::Value,
    pub previous_box: Option<u8>,
    pub new_box: Option<u8>,
}

#[derive(Serialize, ToSchema)]
pub struct ReviewResponse {
    pub session_id: Uuid,
    pub kind: String,
    pub quiz_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: Option<OutcomeResponse>,
    pub items: Vec<ReviewItemView>,
}

impl TryFrom<SessionReview> for ReviewResponse {
    type Error = serde_json::Error;

    fn try_from(review: SessionReview) -> Result<Self, Self::Error> {
        let (kind, quiz_id, _) = kind_parts(&review.session);
        let mut items = Vec::with_capacity(review.items.len());
        for item in review.items {
            let transition = item.answer.as_ref().and_then(|a| a.transition);
            items.push(ReviewItemView {
                question_id: item.question.id,
                question_type: item.question.body.kind().as_str().to_string(),
                content_text: item.question.content_text,
                explanation: item.question.explanation,
                media_ref: item.question.media_ref,
                is_correct: item.answer.as_ref().map(|a| a.is_correct),
                submitted: item.answer.map(|a| serde_json::to_value(a.answer)).transpose()?,
                correct_answer: serde_json::to_value(&item.question.body)?,
                previous_box: transition.map(|t| t.previous.get()),
                new_box: transition.map(|t| t.new.get()),
            });
        }
        Ok(Self {
            session_id: review.session.id,
            kind,
            quiz_id,
            started_at: review.session.started_at,
            completed_at: review.session.completed_at,
            outcome: review.session.outcome.map(|o| OutcomeResponse::new(review.session.id, o)),
            items,
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct BoxView {
    pub level: u8,
    pub question_count: u32,
    pub percentage: f64,
    pub selection_weight: f64,
}

#[derive(Serialize, ToSchema)]
pub struct BoxStatusResponse {
    pub classroom_id: Uuid,
    pub total_questions: u32,
    pub boxes: Vec<BoxView>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl From<BoxStatus> for BoxStatusResponse {
    fn from(status: BoxStatus) -> Self {
        Self {
            classroom_id: status.classroom_id,
            total_questions: status.total_questions,
            boxes: status
                .boxes
                .into_iter()
                .map(|b| BoxView {
                    level: b.level.get(),
                    question_count: b.question_count,
                    percentage: b.percentage,
                    selection_weight: b.selection_weight,
                })
                .collect(),
            last_reviewed_at: status.last_reviewed_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuizStatusResponse {
    pub quiz_id: Uuid,
    pub locked: bool,
    pub completed: bool,
    pub attempts: u32,
    /// Best completed score as a fraction of the maximum, if any attempt finished.
    pub best_ratio: Option<f64>,
    pub pass_threshold: u32,
}

impl From<QuizStatus> for QuizStatusResponse {
    fn from(s: QuizStatus) -> Self {
        Self {
            quiz_id: s.quiz_id,
            locked: s.locked,
            completed: s.completed,
            attempts: s.attempts,
            best_ratio: s.best_ratio,
            pass_threshold: s.pass_threshold,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ModuleStatusResponse {
    pub module_id: Uuid,
    pub locked: bool,
    pub completed: bool,
    pub total_quizzes: u32,
    pub completed_quizzes: u32,
}

impl From<ModuleStatus> for ModuleStatusResponse {
    fn from(s: ModuleStatus) -> Self {
        Self {
            module_id: s.module_id,
            locked: s.locked,
            completed: s.completed,
            total_quizzes: s.total_quizzes,
            completed_quizzes: s.completed_quizzes,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Start a session on a quiz.
#[utoipa::path(
    post,
    path = "/quizzes/{id}/sessions",
    responses(
        (status = 201, description = "Session started", body = StartedSessionResponse),
        (status = 400, description = "The quiz has no questions"),
        (status = 403, description = "Inactive, locked, or caller not enrolled"),
        (status = 404, description = "Quiz not found")
    ),
    params(
        ("id" = Uuid, Path, description = "The quiz to attempt."),
        ("x-student-id" = Uuid, Header, description = "The unique ID of the student.")
    )
)]
pub async fn start_quiz_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(StudentId(student_id)): Extension<StudentId>,
    Path(quiz_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let started = state
        .sessions
        .start_standard_session(quiz_id, student_id)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(StartedSessionResponse::from(started))))
}

/// Start a Leitner review over the caller's boxes in a classroom.
#[utoipa::path(
    post,
    path = "/classrooms/{id}/leitner/sessions",
    request_body = StartLeitnerRequest,
    responses(
        (status = 201, description = "Session started", body = StartedSessionResponse),
        (status = 400, description = "Invalid question count or empty inventory"),
        (status = 403, description = "Caller not enrolled")
    ),
    params(
        ("id" = Uuid, Path, description = "The classroom to review."),
        ("x-student-id" = Uuid, Header, description = "The unique ID of the student.")
    )
)]
pub async fn start_leitner_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(StudentId(student_id)): Extension<StudentId>,
    Path(classroom_id): Path<Uuid>,
    Json(payload): Json<StartLeitnerRequest>,
) -> ApiResult<impl IntoResponse> {
    let requested = payload.requested_count()?;
    let started = state
        .sessions
        .start_leitner_session(classroom_id, student_id, requested)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(StartedSessionResponse::from(started))))
}

/// Per-box counts of the caller's Leitner inventory in a classroom.
#[utoipa::path(
    get,
    path = "/classrooms/{id}/leitner/status",
    responses(
        (status = 200, description = "Box counts", body = BoxStatusResponse),
        (status = 403, description = "Caller not enrolled")
    ),
    params(
        ("id" = Uuid, Path, description = "The classroom."),
        ("x-student-id" = Uuid, Header, description = "The unique ID of the student.")
    )
)]
pub async fn leitner_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(StudentId(student_id)): Extension<StudentId>,
    Path(classroom_id): Path<Uuid>,
) -> ApiResult<Json<BoxStatusResponse>> {
    let status = state.sessions.box_status(classroom_id, student_id).await.map_err(reject)?;
    Ok(Json(status.into()))
}

/// Submit the single answer for one question of a session.
#[utoipa::path(
    post,
    path = "/sessions/{id}/answers",
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = AnswerResponse),
        (status = 400, description = "Question not part of the session"),
        (status = 403, description = "Not the session owner"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Already answered, or the session is finished")
    ),
    params(
        ("id" = Uuid, Path, description = "The session."),
        ("x-student-id" = Uuid, Header, description = "The unique ID of the student.")
    )
)]
pub async fn submit_answer_handler(
    State(state): State<Arc<AppState>>,
    Extension(StudentId(student_id)): Extension<StudentId>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> ApiResult<Json<AnswerResponse>> {
    let (question_id, answer) = payload.into_parts();
    let verdict = state
        .sessions
        .submit_answer(session_id, student_id, question_id, answer)
        .await
        .map_err(reject)?;
    Ok(Json(AnswerResponse {
        is_correct: verdict.is_correct,
        previous_box: verdict.transition.map(|t| t.previous.get()),
        new_box: verdict.transition.map(|t| t.new.get()),
    }))
}

/// Finish a session: score it, apply box moves and record completions.
#[utoipa::path(
    post,
    path = "/sessions/{id}/finish",
    responses(
        (status = 200, description = "Session finished", body = OutcomeResponse),
        (status = 403, description = "Not the session owner"),
        (status = 404, description = "Session not found"),
        (status = 409, description = "Session already finished or abandoned")
    ),
    params(
        ("id" = Uuid, Path, description = "The session."),
        ("x-student-id" = Uuid, Header, description = "The unique ID of the student.")
    )
)]
pub async fn finish_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(StudentId(student_id)): Extension<StudentId>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<OutcomeResponse>> {
    let outcome = state.sessions.finish_session(session_id, student_id).await.map_err(reject)?;
    Ok(Json(OutcomeResponse::new(session_id, outcome)))
}

/// Review a finished session with correct answers and explanations.
#[utoipa::path(
    get,
    path = "/sessions/{id}/review",
    responses(
        (status = 200, description = "Session review", body = ReviewResponse),
        (status = 403, description = "Not the owner, or the session is not finished"),
        (status = 404, description = "Session not found")
    ),
    params(
        ("id" = Uuid, Path, description = "The session."),
        ("x-student-id" = Uuid, Header, description = "The unique ID of the student.")
    )
)]
pub async fn review_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(StudentId(student_id)): Extension<StudentId>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<ReviewResponse>> {
    let review = state.sessions.review_session(session_id, student_id).await.map_err(reject)?;
    let response = ReviewResponse::try_from(review).map_err(|e| {
        error!("Failed to encode review of session {}: {:?}", session_id, e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    })?;
    Ok(Json(response))
}

/// Set or clear a quiz's prerequisite quiz.
///
/// Admin-only. The role check lives in the authentication layer in front of
/// this service; here the header only identifies the editor for the audit log.
#[utoipa::path(
    put,
    path = "/quizzes/{id}/prerequisite",
    request_body = SetPrerequisiteRequest,
    responses(
        (status = 204, description = "Prerequisite updated"),
        (status = 400, description = "Prerequisite in another classroom"),
        (status = 404, description = "Quiz or prerequisite not found"),
        (status = 422, description = "The link would create a cycle")
    ),
    params(
        ("id" = Uuid, Path, description = "The quiz to gate."),
        ("x-student-id" = Uuid, Header, description = "The editing administrator.")
    )
)]
pub async fn set_quiz_prerequisite_handler(
    State(state): State<Arc<AppState>>,
    Extension(StudentId(editor_id)): Extension<StudentId>,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<SetPrerequisiteRequest>,
) -> ApiResult<StatusCode> {
    state
        .curriculum
        .set_quiz_prerequisite(quiz_id, payload.prerequisite_id)
        .await
        .map_err(reject)?;
    info!(%editor_id, %quiz_id, prerequisite_id = ?payload.prerequisite_id, "Prerequisite edited");
    Ok(StatusCode::NO_CONTENT)
}

/// Set or clear a module's prerequisite module. Admin-only, like the quiz edit.
#[utoipa::path(
    put,
    path = "/modules/{id}/prerequisite",
    request_body = SetPrerequisiteRequest,
    responses(
        (status = 204, description = "Prerequisite updated"),
        (status = 400, description = "Prerequisite in another classroom"),
        (status = 404, description = "Module or prerequisite not found"),
        (status = 422, description = "The link would create a cycle")
    ),
    params(
        ("id" = Uuid, Path, description = "The module to gate."),
        ("x-student-id" = Uuid, Header, description = "The editing administrator.")
    )
)]
pub async fn set_module_prerequisite_handler(
    State(state): State<Arc<AppState>>,
    Extension(StudentId(editor_id)): Extension<StudentId>,
    Path(module_id): Path<Uuid>,
    Json(payload): Json<SetPrerequisiteRequest>,
) -> ApiResult<StatusCode> {
    state
        .curriculum
        .set_module_prerequisite(module_id, payload.prerequisite_id)
        .await
        .map_err(reject)?;
    info!(%editor_id, %module_id, prerequisite_id = ?payload.prerequisite_id, "Prerequisite edited");
    Ok(StatusCode::NO_CONTENT)
}

/// Lock and completion state of a quiz for the caller.
#[utoipa::path(
    get,
    path = "/quizzes/{id}/status",
    responses(
        (status = 200, description = "Quiz status", body = QuizStatusResponse),
        (status = 403, description = "Caller not enrolled"),
        (status = 404, description = "Quiz not found")
    ),
    params(
        ("id" = Uuid, Path, description = "The quiz."),
        ("x-student-id" = Uuid, Header, description = "The unique ID of the student.")
    )
)]
pub async fn quiz_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(StudentId(student_id)): Extension<StudentId>,
    Path(quiz_id): Path<Uuid>,
) -> ApiResult<Json<QuizStatusResponse>> {
    let status = state.curriculum.quiz_status(quiz_id, student_id).await.map_err(reject)?;
    Ok(Json(status.into()))
}

/// Lock and completion state of a module for the caller.
#[utoipa::path(
    get,
    path = "/modules/{id}/status",
    responses(
        (status = 200, description = "Module status", body = ModuleStatusResponse),
        (status = 403, description = "Caller not enrolled"),
        (status = 404, description = "Module not found")
    ),
    params(
        ("id" = Uuid, Path, description = "The module."),
        ("x-student-id" = Uuid, Header, description = "The unique ID of the student.")
    )
)]
pub async fn module_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(StudentId(student_id)): Extension<StudentId>,
    Path(module_id): Path<Uuid>,
) -> ApiResult<Json<ModuleStatusResponse>> {
    let status = state.curriculum.module_status(module_id, student_id).await.map_err(reject)?;
    Ok(Json(status.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use progression_core::domain::{ChoiceOption, MatchingPair, SubjectKind};
    use progression_core::PortError;

    #[test]
    fn errors_map_to_statuses() {
        let id = Uuid::new_v4();
        assert_eq!(status_for(&ProgressionError::QuizNotFound(id)), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&ProgressionError::QuizLocked(id)), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(&ProgressionError::DuplicateAnswer { session_id: id, question_id: id }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&ProgressionError::SessionAlreadyFinished(id)), StatusCode::CONFLICT);
        assert_eq!(status_for(&ProgressionError::SessionNotFinished(id)), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(&ProgressionError::CircularDependency(SubjectKind::Quiz)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_for(&ProgressionError::InvalidQuestionCount(7)), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&ProgressionError::NoQuestionsAvailable), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&ProgressionError::Port(PortError::Unexpected("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let (status, body) = reject(ProgressionError::Port(PortError::Unexpected("password=hunter2".into())));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("hunter2"));
    }

    #[test]
    fn question_view_hides_answers() {
        let choice = Question {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            content_text: "Heel bone?".into(),
            explanation: None,
            media_ref: None,
            body: QuestionBody::ChoiceSingle {
                options: vec![ChoiceOption { id: Uuid::new_v4(), text: "Calcaneus".into(), is_correct: true }],
            },
        };
        let json = serde_json::to_value(QuestionView::from(&choice)).unwrap();
        assert_eq!(json["question_type"], "CHOICE_SINGLE");
        assert!(json["options"][0].get("is_correct").is_none());

        let matching = Question {
            body: QuestionBody::Matching {
                pairs: vec![
                    MatchingPair { left_item: "Femur".into(), right_item: "Thigh".into() },
                    MatchingPair { left_item: "Radius".into(), right_item: "Forearm".into() },
                ],
            },
            ..choice
        };
        let view = QuestionView::from(&matching);
        assert_eq!(view.left_items, Some(vec!["Femur".to_string(), "Radius".to_string()]));
        assert_eq!(view.right_items, Some(vec!["Forearm".to_string(), "Thigh".to_string()]));
    }

    #[test]
    fn openapi_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/quizzes/{id}/sessions",
            "/classrooms/{id}/leitner/sessions",
            "/classrooms/{id}/leitner/status",
            "/sessions/{id}/answers",
            "/sessions/{id}/finish",
            "/sessions/{id}/review",
            "/quizzes/{id}/prerequisite",
            "/modules/{id}/prerequisite",
            "/quizzes/{id}/status",
            "/modules/{id}/status",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
