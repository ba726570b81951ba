//! crates/progression_core/src/lifecycle.rs
//!
//! The session lifecycle: start, submit, finish and review, for both fixed
//! quizzes and Leitner reviews. This is the only place where evaluator,
//! scheduler and prerequisite results become user-facing errors.
//!
//! A session moves `IN_PROGRESS -> COMPLETED` on finish or
//! `IN_PROGRESS -> ABANDONED` once it outlives its time-to-live. Terminal
//! states never change again.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::curriculum::{ensure_member, load_module, load_quiz, module_locked, quiz_locked};
use crate::domain::{
    group_by_level, BoxLevel, BoxMovement, BoxStatus, BoxTransition, Question, Quiz, Session,
    SessionAnswer, SessionKind, SessionOutcome, SessionQuestion, SessionStatus, SubmittedAnswer,
};
use crate::error::{ProgressionError, ProgressionResult};
use crate::evaluator;
use crate::ports::{
    CatalogService, FinishCommit, MembershipService, PassRecord, PortError, ProgressStore,
};
use crate::scheduler::{self, BoxScheduler, ScheduleError};

/// Default age after which an unfinished session is abandoned.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 120;

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub session_ttl: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self { session_ttl: Duration::minutes(DEFAULT_SESSION_TTL_MINUTES) }
    }
}

//=========================================================================================
// Results
//=========================================================================================

/// A freshly started session and the questions to show.
#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    pub session: Session,
    pub questions: Vec<Question>,
    /// How many selected questions came from each box (Leitner sessions only).
    pub box_distribution: Option<[u32; BoxLevel::COUNT]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnswerVerdict {
    pub is_correct: bool,
    pub transition: Option<BoxTransition>,
}

/// One question of a finished session, with the student's answer if any.
/// The question carries its correct-answer payload and explanation.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewItem {
    pub question: Question,
    pub answer: Option<SessionAnswer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReview {
    pub session: Session,
    pub items: Vec<ReviewItem>,
}

//=========================================================================================
// The Manager
//=========================================================================================

#[derive(Clone)]
pub struct SessionManager {
    catalog: Arc<dyn CatalogService>,
    members: Arc<dyn MembershipService>,
    store: Arc<dyn ProgressStore>,
    scheduler: BoxScheduler,
    config: LifecycleConfig,
}

impl SessionManager {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        members: Arc<dyn MembershipService>,
        store: Arc<dyn ProgressStore>,
        scheduler: BoxScheduler,
        config: LifecycleConfig,
    ) -> Self {
        Self { catalog, members, store, scheduler, config }
    }

    // --- Start ---

    pub async fn start_standard_session(
        &self,
        quiz_id: Uuid,
        student_id: Uuid,
    ) -> ProgressionResult<StartedSession> {
        let quiz = load_quiz(self.catalog.as_ref(), quiz_id).await?;
        if !quiz.is_active {
            return Err(ProgressionError::QuizInactive(quiz_id));
        }
        ensure_member(self.members.as_ref(), quiz.classroom_id, student_id).await?;

        if quiz_locked(self.store.as_ref(), &quiz, student_id).await? {
            return Err(ProgressionError::QuizLocked(quiz_id));
        }
        let module = load_module(self.catalog.as_ref(), quiz.module_id).await?;
        if module_locked(self.store.as_ref(), &module, student_id).await? {
            return Err(ProgressionError::ModuleLocked(module.id));
        }

        let questions = self.catalog.questions_for_quiz(quiz_id).await?;
        if questions.is_empty() {
            return Err(ProgressionError::NoQuestions(quiz_id));
        }

        let session = Session {
            id: Uuid::new_v4(),
            student_id,
            classroom_id: quiz.classroom_id,
            kind: SessionKind::Standard { quiz_id },
            status: SessionStatus::InProgress,
            questions: questions
                .iter()
                .map(|q| SessionQuestion { question_id: q.id, previous_box: None })
                .collect(),
            started_at: Utc::now(),
            completed_at: None,
            outcome: None,
        };
        self.store.create_session(&session).await?;

        info!(
            session_id = %session.id,
            %quiz_id,
            %student_id,
            questions = questions.len(),
            "Started quiz session"
        );
        Ok(StartedSession { session, questions, box_distribution: None })
    }

    pub async fn start_leitner_session(
        &self,
        classroom_id: Uuid,
        student_id: Uuid,
        requested_count: u32,
    ) -> ProgressionResult<StartedSession> {
        if !self.scheduler.is_valid_count(requested_count) {
            return Err(ProgressionError::InvalidQuestionCount(requested_count));
        }
        ensure_member(self.members.as_ref(), classroom_id, student_id).await?;

        let entries = self.store.box_entries(student_id, classroom_id).await?;
        let inventory = group_by_level(&entries);
        let draws = {
            let mut rng = rand::thread_rng();
            self.scheduler
                .select(&inventory, requested_count as usize, &mut rng)
                .map_err(|ScheduleError::NoQuestionsAvailable| ProgressionError::NoQuestionsAvailable)?
        };
        if draws.is_empty() {
            return Err(ProgressionError::NoQuestionsAvailable);
        }

        let mut questions = Vec::with_capacity(draws.len());
        for draw in &draws {
            questions.push(self.catalog.get_question(draw.question_id).await?);
        }

        let session = Session {
            id: Uuid::new_v4(),
            student_id,
            classroom_id,
            kind: SessionKind::Leitner { requested_count },
            status: SessionStatus::InProgress,
            questions: draws
                .iter()
                .map(|d| SessionQuestion { question_id: d.question_id, previous_box: Some(d.level) })
                .collect(),
            started_at: Utc::now(),
            completed_at: None,
            outcome: None,
        };
        self.store.create_session(&session).await?;

        let box_distribution = scheduler::distribution(&draws);
        info!(
            session_id = %session.id,
            %classroom_id,
            %student_id,
            requested = requested_count,
            selected = draws.len(),
            ?box_distribution,
            "Started Leitner session"
        );
        Ok(StartedSession { session, questions, box_distribution: Some(box_distribution) })
    }

    // --- Submit ---

    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        student_id: Uuid,
        question_id: Uuid,
        answer: SubmittedAnswer,
    ) -> ProgressionResult<AnswerVerdict> {
        let session = self.owned_session(session_id, student_id).await?;
        if session.status != SessionStatus::InProgress {
            return Err(ProgressionError::SessionAlreadyFinished(session_id));
        }
        if session.is_expired(Utc::now(), self.config.session_ttl) {
            if self.store.abandon_session(session_id).await? {
                info!(%session_id, "Abandoned expired session");
            }
            return Err(ProgressionError::SessionAlreadyFinished(session_id));
        }

        let not_in_session = || ProgressionError::QuestionNotInSession { session_id, question_id };
        let slot = *session.question(question_id).ok_or_else(not_in_session)?;
        let question = self.catalog.get_question(question_id).await.map_err(|e| match e {
            PortError::NotFound(_) => not_in_session(),
            other => other.into(),
        })?;

        let is_correct = evaluator::evaluate(&question, &answer);

        let transition = match slot.previous_box {
            Some(previous) => {
                // The question may have been deleted from the inventory mid-session.
                self.store
                    .get_box_entry(student_id, session.classroom_id, question_id)
                    .await?
                    .ok_or_else(not_in_session)?;
                Some(BoxTransition::for_verdict(previous, is_correct))
            }
            None => None,
        };

        let record = SessionAnswer {
            session_id,
            question_id,
            is_correct,
            answer,
            transition,
            answered_at: Utc::now(),
        };
        self.store.insert_answer(&record).await.map_err(|e| match e {
            PortError::Conflict(_) => ProgressionError::DuplicateAnswer { session_id, question_id },
            other => other.into(),
        })?;

        debug!(%session_id, %question_id, is_correct, ?transition, "Recorded answer");
        Ok(AnswerVerdict { is_correct, transition })
    }

    // --- Finish ---

    /// Scores the session from its stored answers and completes it.
    ///
    /// Everything is derived from persisted answers; Leitner box moves are
    /// the transitions stored at submit time, written back as-is.
    pub async fn finish_session(
        &self,
        session_id: Uuid,
        student_id: Uuid,
    ) -> ProgressionResult<SessionOutcome> {
        let session = self.owned_session(session_id, student_id).await?;
        if session.status != SessionStatus::InProgress {
            return Err(ProgressionError::SessionAlreadyFinished(session_id));
        }

        let answers = self.store.answers_for_session(session_id).await?;
        let score = answers.iter().filter(|a| a.is_correct).count() as u32;
        let max_score = session.questions.len() as u32;

        let (passed, box_movement, box_updates, pass) = match session.kind {
            SessionKind::Standard { quiz_id } => {
                let quiz = load_quiz(self.catalog.as_ref(), quiz_id).await?;
                let passed = score >= quiz.pass_threshold;
                let pass = if passed { Some(self.pass_record(&quiz).await?) } else { None };
                (passed, None, Vec::new(), pass)
            }
            SessionKind::Leitner { .. } => {
                let mut movement = BoxMovement::default();
                let mut updates = Vec::with_capacity(answers.len());
                for (answer, transition) in answers.iter().filter_map(|a| a.transition.map(|t| (a, t))) {
                    if transition.is_promotion() {
                        movement.promoted += 1;
                    } else if transition.is_demotion() {
                        movement.demoted += 1;
                    }
                    updates.push((answer.question_id, transition.new));
                }
                (true, Some(movement), updates, None)
            }
        };

        let outcome = SessionOutcome {
            score,
            max_score,
            answered: answers.len() as u32,
            passed,
            box_movement,
        };
        let commit = FinishCommit {
            session_id,
            outcome,
            completed_at: Utc::now(),
            box_updates,
            pass,
        };
        let receipt = self
            .store
            .commit_finish(&commit)
            .await?
            .ok_or(ProgressionError::SessionAlreadyFinished(session_id))?;

        if let Some(pass) = &commit.pass {
            let student_id = session.student_id;
            if receipt.quiz_completed {
                info!(%student_id, quiz_id = %pass.quiz_id, "Quiz completed");
            }
            debug!(%student_id, quiz_id = %pass.quiz_id, seeded = receipt.seeded, "Seeded Leitner inventory");
            if receipt.module_completed {
                info!(%student_id, module_id = %pass.module_id, "Module completed");
            }
        }

        info!(
            %session_id,
            score,
            max_score,
            passed,
            box_movement = ?box_movement,
            "Finished session"
        );
        Ok(outcome)
    }

    /// Everything a pass of `quiz` writes: its questions to seed and the
    /// module's gating quizzes to check for module completion.
    async fn pass_record(&self, quiz: &Quiz) -> ProgressionResult<PassRecord> {
        let seed_question_ids = self
            .catalog
            .questions_for_quiz(quiz.id)
            .await?
            .into_iter()
            .map(|q| q.id)
            .collect();
        let gating_quiz_ids = self
            .catalog
            .quizzes_in_module(quiz.module_id)
            .await?
            .into_iter()
            .filter(Quiz::is_gating)
            .map(|q| q.id)
            .collect();
        Ok(PassRecord {
            quiz_id: quiz.id,
            module_id: quiz.module_id,
            seed_question_ids,
            gating_quiz_ids,
        })
    }

    // --- Review ---

    pub async fn review_session(
        &self,
        session_id: Uuid,
        student_id: Uuid,
    ) -> ProgressionResult<SessionReview> {
        let session = self.owned_session(session_id, student_id).await?;
        if session.status != SessionStatus::Completed {
            return Err(ProgressionError::SessionNotFinished(session_id));
        }

        let mut answers: HashMap<Uuid, SessionAnswer> = self
            .store
            .answers_for_session(session_id)
            .await?
            .into_iter()
            .map(|a| (a.question_id, a))
            .collect();

        let mut items = Vec::with_capacity(session.questions.len());
        for slot in &session.questions {
            let question = match self.catalog.get_question(slot.question_id).await {
                Ok(question) => question,
                // Deleted since the session ran; its answers went with it.
                Err(PortError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            items.push(ReviewItem { answer: answers.remove(&question.id), question });
        }

        Ok(SessionReview { session, items })
    }

    // --- Inventory ---

    pub async fn box_status(&self, classroom_id: Uuid, student_id: Uuid) -> ProgressionResult<BoxStatus> {
        ensure_member(self.members.as_ref(), classroom_id, student_id).await?;
        let entries = self.store.box_entries(student_id, classroom_id).await?;
        Ok(BoxStatus::from_entries(classroom_id, &entries, &self.scheduler.config().weights))
    }

    async fn owned_session(&self, session_id: Uuid, student_id: Uuid) -> ProgressionResult<Session> {
        let session = self.store.get_session(session_id).await.map_err(|e| match e {
            PortError::NotFound(_) => ProgressionError::SessionNotFound(session_id),
            other => other.into(),
        })?;
        if session.student_id != student_id {
            return Err(ProgressionError::Forbidden);
        }
        Ok(session)
    }
}
