//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete PostgreSQL
//! implementation of the `CatalogService`, `MembershipService` and
//! `ProgressStore` ports from the core crate. Uniqueness and single-writer
//! rules are enforced by table constraints and conditional updates, so two
//! racing requests can never both win.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use progression_core::domain::{
    BoxEntry, BoxLevel, BoxMovement, BoxTransition, Module, Question, QuestionBody, QuestionKind,
    Quiz, Session, SessionAnswer, SessionKind, SessionOutcome, SessionQuestion, SessionStatus,
    SubjectKind, SubmittedAnswer,
};
use progression_core::ports::{
    CatalogService, FinishCommit, FinishReceipt, MembershipService, PassRecord, PortError,
    PortResult, ProgressStore,
};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::error;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every port of the progression engine.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn begin(&self) -> PortResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(unexpected)
    }

    async fn session_questions(&self, session_id: Uuid) -> PortResult<Vec<SessionQuestion>> {
        let records = sqlx::query_as::<_, SessionQuestionRecord>(
            "SELECT question_id, previous_box FROM session_questions WHERE session_id = $1 ORDER BY position ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(SessionQuestionRecord::to_domain).collect()
    }

    async fn hydrate(&self, record: SessionRecord) -> PortResult<Session> {
        let questions = self.session_questions(record.id).await?;
        record.to_domain(questions)
    }

    async fn session_exists(&self, session_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM sessions WHERE id = $1)")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }
}

/// Writes the completion records of a passed quiz inside the finish transaction.
async fn apply_pass(
    tx: &mut Transaction<'static, Postgres>,
    student_id: Uuid,
    classroom_id: Uuid,
    pass: &PassRecord,
) -> PortResult<FinishReceipt> {
    let quiz_completed = sqlx::query(
        "INSERT INTO quiz_completions (student_id, quiz_id) VALUES ($1, $2) \
         ON CONFLICT (student_id, quiz_id) DO NOTHING",
    )
    .bind(student_id)
    .bind(pass.quiz_id)
    .execute(&mut **tx)
    .await
    .map_err(unexpected)?
    .rows_affected()
        == 1;

    let seeded = sqlx::query(
        "INSERT INTO leitner_boxes (student_id, classroom_id, question_id, level) \
         SELECT $1::uuid, $2::uuid, question_id, 1 FROM UNNEST($3::uuid[]) AS question_id \
         WHERE EXISTS (SELECT 1 FROM classroom_members WHERE classroom_id = $2 AND student_id = $1) \
         ON CONFLICT (student_id, classroom_id, question_id) DO NOTHING",
    )
    .bind(student_id)
    .bind(classroom_id)
    .bind(&pass.seed_question_ids)
    .execute(&mut **tx)
    .await
    .map_err(unexpected)?
    .rows_affected() as usize;

    let completed_gating = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM quiz_completions WHERE student_id = $1 AND quiz_id = ANY($2)",
    )
    .bind(student_id)
    .bind(&pass.gating_quiz_ids)
    .fetch_one(&mut **tx)
    .await
    .map_err(unexpected)?;

    let mut module_completed = false;
    if completed_gating as usize == pass.gating_quiz_ids.len() {
        module_completed = sqlx::query(
            "INSERT INTO module_completions (student_id, module_id) VALUES ($1, $2) \
             ON CONFLICT (student_id, module_id) DO NOTHING",
        )
        .bind(student_id)
        .bind(pass.module_id)
        .execute(&mut **tx)
        .await
        .map_err(unexpected)?
        .rows_affected()
            == 1;
    }

    Ok(FinishReceipt { quiz_completed, seeded, module_completed })
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    error!("Database error: {:?}", e);
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(what: &str, id: Uuid) -> impl FnOnce(sqlx::Error) -> PortError + '_ {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{} {} not found", what, id)),
        other => unexpected(other),
    }
}

/// Unique-constraint violations become `Conflict`; the constraint is the arbiter.
fn conflict_or_unexpected(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            PortError::Conflict(db_err.message().to_string())
        }
        _ => unexpected(e),
    }
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(format!("Corrupt {} row: {}", what, detail))
}

fn box_level(raw: i16) -> PortResult<BoxLevel> {
    BoxLevel::try_from(raw).map_err(|e| corrupt("box level", e))
}

fn count(raw: i32) -> u32 {
    u32::try_from(raw).unwrap_or(0)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const QUIZ_COLUMNS: &str =
    "id, module_id, classroom_id, title, is_active, min_score_to_unlock_next, prerequisite_id";

#[derive(FromRow)]
struct QuizRecord {
    id: Uuid,
    module_id: Uuid,
    classroom_id: Uuid,
    title: String,
    is_active: bool,
    min_score_to_unlock_next: i32,
    prerequisite_id: Option<Uuid>,
}
impl QuizRecord {
    fn to_domain(self) -> Quiz {
        Quiz {
            id: self.id,
            module_id: self.module_id,
            classroom_id: self.classroom_id,
            title: self.title,
            is_active: self.is_active,
            pass_threshold: count(self.min_score_to_unlock_next),
            prerequisite_id: self.prerequisite_id,
        }
    }
}

#[derive(FromRow)]
struct ModuleRecord {
    id: Uuid,
    classroom_id: Uuid,
    name: String,
    prerequisite_id: Option<Uuid>,
}
impl ModuleRecord {
    fn to_domain(self) -> Module {
        Module {
            id: self.id,
            classroom_id: self.classroom_id,
            name: self.name,
            prerequisite_id: self.prerequisite_id,
        }
    }
}

const QUESTION_COLUMNS: &str = "id, quiz_id, content_text, explanation, media_ref, question_type, body";

#[derive(FromRow)]
struct QuestionRecord {
    id: Uuid,
    quiz_id: Uuid,
    content_text: String,
    explanation: Option<String>,
    media_ref: Option<Uuid>,
    question_type: String,
    body: Json<QuestionBody>,
}
impl QuestionRecord {
    /// The `question_type` column must agree with the tagged body.
    fn to_domain(self) -> PortResult<Question> {
        let body = self.body.0;
        if QuestionKind::parse(&self.question_type) != Some(body.kind()) {
            return Err(corrupt(
                "question",
                format!("{} has type {} but a {} body", self.id, self.question_type, body.kind().as_str()),
            ));
        }
        Ok(Question {
            id: self.id,
            quiz_id: self.quiz_id,
            content_text: self.content_text,
            explanation: self.explanation,
            media_ref: self.media_ref,
            body,
        })
    }
}

const SESSION_COLUMNS: &str = "id, student_id, classroom_id, kind, quiz_id, requested_count, status, \
     started_at, completed_at, score, max_score, answered, passed, promoted, demoted";

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    student_id: Uuid,
    classroom_id: Uuid,
    kind: String,
    quiz_id: Option<Uuid>,
    requested_count: Option<i32>,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    score: Option<i32>,
    max_score: Option<i32>,
    answered: Option<i32>,
    passed: Option<bool>,
    promoted: Option<i32>,
    demoted: Option<i32>,
}
impl SessionRecord {
    fn to_domain(self, questions: Vec<SessionQuestion>) -> PortResult<Session> {
        let kind = match (self.kind.as_str(), self.quiz_id) {
            ("standard", Some(quiz_id)) => SessionKind::Standard { quiz_id },
            ("leitner", _) => SessionKind::Leitner {
                requested_count: count(self.requested_count.unwrap_or(0)),
            },
            (other, _) => return Err(corrupt("session", format!("kind '{}'", other))),
        };
        let status = SessionStatus::parse(&self.status)
            .ok_or_else(|| corrupt("session", format!("status '{}'", self.status)))?;

        let outcome = match (self.score, self.max_score, self.answered, self.passed) {
            (Some(score), Some(max_score), Some(answered), Some(passed)) => Some(SessionOutcome {
                score: count(score),
                max_score: count(max_score),
                answered: count(answered),
                passed,
                box_movement: match (self.promoted, self.demoted) {
                    (Some(promoted), Some(demoted)) => Some(BoxMovement {
                        promoted: count(promoted),
                        demoted: count(demoted),
                    }),
                    _ => None,
                },
            }),
            _ => None,
        };

        Ok(Session {
            id: self.id,
            student_id: self.student_id,
            classroom_id: self.classroom_id,
            kind,
            status,
            questions,
            started_at: self.started_at,
            completed_at: self.completed_at,
            outcome,
        })
    }
}

#[derive(FromRow)]
struct SessionQuestionRecord {
    question_id: Uuid,
    previous_box: Option<i16>,
}
impl SessionQuestionRecord {
    fn to_domain(self) -> PortResult<SessionQuestion> {
        Ok(SessionQuestion {
            question_id: self.question_id,
            previous_box: self.previous_box.map(box_level).transpose()?,
        })
    }
}

#[derive(FromRow)]
struct AnswerRecord {
    session_id: Uuid,
    question_id: Uuid,
    is_correct: bool,
    answer: Json<SubmittedAnswer>,
    previous_box: Option<i16>,
    new_box: Option<i16>,
    answered_at: DateTime<Utc>,
}
impl AnswerRecord {
    fn to_domain(self) -> PortResult<SessionAnswer> {
        let transition = match (self.previous_box, self.new_box) {
            (Some(previous), Some(new)) => Some(BoxTransition {
                previous: box_level(previous)?,
                new: box_level(new)?,
            }),
            _ => None,
        };
        Ok(SessionAnswer {
            session_id: self.session_id,
            question_id: self.question_id,
            is_correct: self.is_correct,
            answer: self.answer.0,
            transition,
            answered_at: self.answered_at,
        })
    }
}

const BOX_COLUMNS: &str = "student_id, classroom_id, question_id, level, added_at, last_reviewed_at";

#[derive(FromRow)]
struct BoxRecord {
    student_id: Uuid,
    classroom_id: Uuid,
    question_id: Uuid,
    level: i16,
    added_at: DateTime<Utc>,
    last_reviewed_at: Option<DateTime<Utc>>,
}
impl BoxRecord {
    fn to_domain(self) -> PortResult<BoxEntry> {
        Ok(BoxEntry {
            student_id: self.student_id,
            classroom_id: self.classroom_id,
            question_id: self.question_id,
            level: box_level(self.level)?,
            added_at: self.added_at,
            last_reviewed_at: self.last_reviewed_at,
        })
    }
}

//=========================================================================================
// `CatalogService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogService for DbAdapter {
    async fn get_quiz(&self, quiz_id: Uuid) -> PortResult<Quiz> {
        let record = sqlx::query_as::<_, QuizRecord>(&format!(
            "SELECT {} FROM quizzes WHERE id = $1",
            QUIZ_COLUMNS
        ))
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Quiz", quiz_id))?;
        Ok(record.to_domain())
    }

    async fn get_module(&self, module_id: Uuid) -> PortResult<Module> {
        let record = sqlx::query_as::<_, ModuleRecord>(
            "SELECT id, classroom_id, name, prerequisite_id FROM modules WHERE id = $1",
        )
        .bind(module_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Module", module_id))?;
        Ok(record.to_domain())
    }

    async fn get_question(&self, question_id: Uuid) -> PortResult<Question> {
        let record = sqlx::query_as::<_, QuestionRecord>(&format!(
            "SELECT {} FROM questions WHERE id = $1",
            QUESTION_COLUMNS
        ))
        .bind(question_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Question", question_id))?;
        record.to_domain()
    }

    async fn questions_for_quiz(&self, quiz_id: Uuid) -> PortResult<Vec<Question>> {
        let records = sqlx::query_as::<_, QuestionRecord>(&format!(
            "SELECT {} FROM questions WHERE quiz_id = $1 ORDER BY position ASC, created_at ASC",
            QUESTION_COLUMNS
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(QuestionRecord::to_domain).collect()
    }

    async fn quizzes_in_module(&self, module_id: Uuid) -> PortResult<Vec<Quiz>> {
        let records = sqlx::query_as::<_, QuizRecord>(&format!(
            "SELECT {} FROM quizzes WHERE module_id = $1 ORDER BY created_at ASC",
            QUIZ_COLUMNS
        ))
        .bind(module_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_question(&self, question_id: Uuid) -> PortResult<()> {
        // Box entries and answers follow through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Question {} not found", question_id)));
        }
        Ok(())
    }

    async fn prerequisite_edges(
        &self,
        kind: SubjectKind,
        classroom_id: Uuid,
    ) -> PortResult<HashMap<Uuid, Uuid>> {
        let sql = match kind {
            SubjectKind::Quiz => {
                "SELECT id, prerequisite_id FROM quizzes WHERE classroom_id = $1 AND prerequisite_id IS NOT NULL"
            }
            SubjectKind::Module => {
                "SELECT id, prerequisite_id FROM modules WHERE classroom_id = $1 AND prerequisite_id IS NOT NULL"
            }
        };
        let edges = sqlx::query_as::<_, (Uuid, Uuid)>(sql)
            .bind(classroom_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(edges.into_iter().collect())
    }

    async fn set_prerequisite(
        &self,
        kind: SubjectKind,
        subject_id: Uuid,
        prerequisite_id: Option<Uuid>,
    ) -> PortResult<()> {
        let sql = match kind {
            SubjectKind::Quiz => "UPDATE quizzes SET prerequisite_id = $1 WHERE id = $2",
            SubjectKind::Module => "UPDATE modules SET prerequisite_id = $1 WHERE id = $2",
        };
        let result = sqlx::query(sql)
            .bind(prerequisite_id)
            .bind(subject_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("{} {} not found", kind, subject_id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `MembershipService` Trait Implementation
//=========================================================================================

#[async_trait]
impl MembershipService for DbAdapter {
    async fn is_classroom_member(&self, classroom_id: Uuid, student_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM classroom_members WHERE classroom_id = $1 AND student_id = $2)",
        )
        .bind(classroom_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }
}

//=========================================================================================
// `ProgressStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ProgressStore for DbAdapter {
    async fn create_session(&self, session: &Session) -> PortResult<()> {
        let (kind, quiz_id, requested_count) = match session.kind {
            SessionKind::Standard { quiz_id } => ("standard", Some(quiz_id), None),
            SessionKind::Leitner { requested_count } => {
                ("leitner", None, Some(requested_count as i32))
            }
        };

        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO sessions (id, student_id, classroom_id, kind, quiz_id, requested_count, status, started_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(session.id)
        .bind(session.student_id)
        .bind(session.classroom_id)
        .bind(kind)
        .bind(quiz_id)
        .bind(requested_count)
        .bind(session.status.as_str())
        .bind(session.started_at)
        .execute(&mut *tx)
        .await
        .map_err(conflict_or_unexpected)?;

        for (position, slot) in session.questions.iter().enumerate() {
            sqlx::query(
                "INSERT INTO session_questions (session_id, question_id, position, previous_box) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(session.id)
            .bind(slot.question_id)
            .bind(position as i32)
            .bind(slot.previous_box.map(|level| i16::from(level.get())))
            .execute(&mut *tx)
            .await
            .map_err(conflict_or_unexpected)?;
        }

        tx.commit().await.map_err(unexpected)
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {} FROM sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected("Session", session_id))?;
        self.hydrate(record).await
    }

    async fn abandon_session(&self, session_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET status = 'ABANDONED' WHERE id = $1 AND status = 'IN_PROGRESS'",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }
        if self.session_exists(session_id).await? {
            Ok(false)
        } else {
            Err(PortError::NotFound(format!("Session {} not found", session_id)))
        }
    }

    async fn commit_finish(&self, commit: &FinishCommit) -> PortResult<Option<FinishReceipt>> {
        let outcome = commit.outcome;
        let movement = outcome.box_movement;

        let mut tx = self.begin().await?;
        // The status guard makes this the single winning writer.
        let owner = sqlx::query_as::<_, (Uuid, Uuid)>(
            "UPDATE sessions SET status = 'COMPLETED', completed_at = $2, score = $3, max_score = $4, \
             answered = $5, passed = $6, promoted = $7, demoted = $8 \
             WHERE id = $1 AND status = 'IN_PROGRESS' \
             RETURNING student_id, classroom_id",
        )
        .bind(commit.session_id)
        .bind(commit.completed_at)
        .bind(outcome.score as i32)
        .bind(outcome.max_score as i32)
        .bind(outcome.answered as i32)
        .bind(outcome.passed)
        .bind(movement.map(|m| m.promoted as i32))
        .bind(movement.map(|m| m.demoted as i32))
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?;

        let Some((student_id, classroom_id)) = owner else {
            tx.rollback().await.map_err(unexpected)?;
            return if self.session_exists(commit.session_id).await? {
                Ok(None)
            } else {
                Err(PortError::NotFound(format!("Session {} not found", commit.session_id)))
            };
        };

        for (question_id, level) in &commit.box_updates {
            sqlx::query(
                "UPDATE leitner_boxes SET level = $4, last_reviewed_at = $5 \
                 WHERE student_id = $1 AND classroom_id = $2 AND question_id = $3",
            )
            .bind(student_id)
            .bind(classroom_id)
            .bind(question_id)
            .bind(i16::from(level.get()))
            .bind(commit.completed_at)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        let mut receipt = FinishReceipt::default();
        if let Some(pass) = &commit.pass {
            receipt = apply_pass(&mut tx, student_id, classroom_id, pass).await?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(Some(receipt))
    }

    async fn completed_quiz_sessions(
        &self,
        student_id: Uuid,
        quiz_id: Uuid,
    ) -> PortResult<Vec<Session>> {
        let records = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {} FROM sessions WHERE student_id = $1 AND quiz_id = $2 AND status = 'COMPLETED' \
             ORDER BY started_at ASC",
            SESSION_COLUMNS
        ))
        .bind(student_id)
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let mut sessions = Vec::with_capacity(records.len());
        for record in records {
            sessions.push(self.hydrate(record).await?);
        }
        Ok(sessions)
    }

    async fn insert_answer(&self, answer: &SessionAnswer) -> PortResult<()> {
        let (previous_box, new_box) = match answer.transition {
            Some(t) => (Some(i16::from(t.previous.get())), Some(i16::from(t.new.get()))),
            None => (None, None),
        };
        sqlx::query(
            "INSERT INTO session_answers \
             (session_id, question_id, is_correct, answer, previous_box, new_box, answered_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(answer.session_id)
        .bind(answer.question_id)
        .bind(answer.is_correct)
        .bind(Json(&answer.answer))
        .bind(previous_box)
        .bind(new_box)
        .bind(answer.answered_at)
        .execute(&self.pool)
        .await
        .map_err(conflict_or_unexpected)?;
        Ok(())
    }

    async fn answers_for_session(&self, session_id: Uuid) -> PortResult<Vec<SessionAnswer>> {
        let records = sqlx::query_as::<_, AnswerRecord>(
            "SELECT session_id, question_id, is_correct, answer, previous_box, new_box, answered_at \
             FROM session_answers WHERE session_id = $1 ORDER BY answered_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(AnswerRecord::to_domain).collect()
    }

    async fn box_entries(&self, student_id: Uuid, classroom_id: Uuid) -> PortResult<Vec<BoxEntry>> {
        let records = sqlx::query_as::<_, BoxRecord>(&format!(
            "SELECT {} FROM leitner_boxes WHERE student_id = $1 AND classroom_id = $2",
            BOX_COLUMNS
        ))
        .bind(student_id)
        .bind(classroom_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(BoxRecord::to_domain).collect()
    }

    async fn get_box_entry(
        &self,
        student_id: Uuid,
        classroom_id: Uuid,
        question_id: Uuid,
    ) -> PortResult<Option<BoxEntry>> {
        let record = sqlx::query_as::<_, BoxRecord>(&format!(
            "SELECT {} FROM leitner_boxes WHERE student_id = $1 AND classroom_id = $2 AND question_id = $3",
            BOX_COLUMNS
        ))
        .bind(student_id)
        .bind(classroom_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(BoxRecord::to_domain).transpose()
    }

    async fn has_completed_quiz(&self, student_id: Uuid, quiz_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM quiz_completions WHERE student_id = $1 AND quiz_id = $2)",
        )
        .bind(student_id)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn has_completed_module(&self, student_id: Uuid, module_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM module_completions WHERE student_id = $1 AND module_id = $2)",
        )
        .bind(student_id)
        .bind(module_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }
}
