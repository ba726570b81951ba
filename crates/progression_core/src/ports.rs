//! crates/progression_core/src/ports.rs
//!
//! Defines the service contracts (traits) the progression engine consumes.
//! These traits form the boundary of the hexagonal architecture: the catalog,
//! the roster and the persistence layer are external collaborators, and the
//! engine only ever talks to them through these ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{
    BoxEntry, BoxLevel, Module, Question, Quiz, Session, SessionAnswer, SessionOutcome,
    SubjectKind,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., the database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness or single-writer constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Write Models
//=========================================================================================

/// The finish-time write for one session, applied atomically by the store.
#[derive(Debug, Clone)]
pub struct FinishCommit {
    pub session_id: Uuid,
    pub outcome: SessionOutcome,
    pub completed_at: DateTime<Utc>,
    /// Live box levels to write for a Leitner session, one per answered question.
    pub box_updates: Vec<(Uuid, BoxLevel)>,
    /// Completion records of a passed quiz, written in the same unit as the status change.
    pub pass: Option<PassRecord>,
}

/// What passing a quiz unlocks for the session's student.
#[derive(Debug, Clone)]
pub struct PassRecord {
    pub quiz_id: Uuid,
    pub module_id: Uuid,
    /// Questions to add at box 1; ones already boxed keep their level.
    pub seed_question_ids: Vec<Uuid>,
    /// Quizzes of the module that must all be completed for the module to complete.
    pub gating_quiz_ids: Vec<Uuid>,
}

/// What a successful finish wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinishReceipt {
    pub quiz_completed: bool,
    pub seeded: usize,
    pub module_completed: bool,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read access to quizzes, modules and questions, plus prerequisite edits.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn get_quiz(&self, quiz_id: Uuid) -> PortResult<Quiz>;

    async fn get_module(&self, module_id: Uuid) -> PortResult<Module>;

    async fn get_question(&self, question_id: Uuid) -> PortResult<Question>;

    async fn questions_for_quiz(&self, quiz_id: Uuid) -> PortResult<Vec<Question>>;

    async fn quizzes_in_module(&self, module_id: Uuid) -> PortResult<Vec<Quiz>>;

    /// Deletes a question. Its box entries and stored answers go with it.
    async fn delete_question(&self, question_id: Uuid) -> PortResult<()>;

    /// Every `subject -> prerequisite` edge of the given kind within a classroom.
    async fn prerequisite_edges(
        &self,
        kind: SubjectKind,
        classroom_id: Uuid,
    ) -> PortResult<HashMap<Uuid, Uuid>>;

    async fn set_prerequisite(
        &self,
        kind: SubjectKind,
        subject_id: Uuid,
        prerequisite_id: Option<Uuid>,
    ) -> PortResult<()>;
}

/// Classroom enrollment, owned by the roster collaborator.
#[async_trait]
pub trait MembershipService: Send + Sync {
    async fn is_classroom_member(&self, classroom_id: Uuid, student_id: Uuid) -> PortResult<bool>;
}

/// Persistence for sessions, answers, Leitner boxes and completion records.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    // --- Sessions ---
    async fn create_session(&self, session: &Session) -> PortResult<()>;

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session>;

    /// Moves an in-progress session to `ABANDONED`. Returns `false` if it was
    /// already terminal.
    async fn abandon_session(&self, session_id: Uuid) -> PortResult<bool>;

    /// Atomically checks that the session is still in progress, marks it
    /// completed with its outcome, applies the box updates and writes the
    /// pass records. Either all of it lands or none of it does. Returns
    /// `None`, writing nothing, if the session had already left `IN_PROGRESS`.
    async fn commit_finish(&self, commit: &FinishCommit) -> PortResult<Option<FinishReceipt>>;

    /// Completed standard sessions of one student for one quiz.
    async fn completed_quiz_sessions(&self, student_id: Uuid, quiz_id: Uuid)
        -> PortResult<Vec<Session>>;

    // --- Answers ---
    /// Inserts an answer. A second answer for the same (session, question)
    /// pair must fail with [`PortError::Conflict`].
    async fn insert_answer(&self, answer: &SessionAnswer) -> PortResult<()>;

    async fn answers_for_session(&self, session_id: Uuid) -> PortResult<Vec<SessionAnswer>>;

    // --- Leitner boxes ---
    async fn box_entries(&self, student_id: Uuid, classroom_id: Uuid) -> PortResult<Vec<BoxEntry>>;

    async fn get_box_entry(
        &self,
        student_id: Uuid,
        classroom_id: Uuid,
        question_id: Uuid,
    ) -> PortResult<Option<BoxEntry>>;

    // --- Completion records ---
    async fn has_completed_quiz(&self, student_id: Uuid, quiz_id: Uuid) -> PortResult<bool>;

    async fn has_completed_module(&self, student_id: Uuid, module_id: Uuid) -> PortResult<bool>;
}
