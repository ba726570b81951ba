//! crates/progression_core/src/memory.rs
//!
//! An in-process implementation of every port. It keeps the same
//! uniqueness and check-and-set rules the SQL store enforces with
//! constraints, so the lifecycle behaves identically on top of it.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{
    BoxEntry, BoxLevel, Module, Question, Quiz, Session, SessionAnswer, SessionStatus, SubjectKind,
};
use crate::ports::{
    CatalogService, FinishCommit, FinishReceipt, MembershipService, PortError, PortResult,
    ProgressStore,
};

#[derive(Default)]
struct State {
    quizzes: HashMap<Uuid, Quiz>,
    modules: HashMap<Uuid, Module>,
    questions: Vec<Question>,
    enrollments: HashSet<(Uuid, Uuid)>,
    sessions: HashMap<Uuid, Session>,
    answers: Vec<SessionAnswer>,
    boxes: HashMap<(Uuid, Uuid, Uuid), BoxEntry>,
    quiz_completions: Vec<(Uuid, Uuid)>,
    module_completions: Vec<(Uuid, Uuid)>,
}

/// Every port behind one mutex. No lock is held across an `.await`.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // --- Seeding (the catalog and roster collaborators' side) ---

    pub fn insert_module(&self, module: Module) {
        self.state().modules.insert(module.id, module);
    }

    pub fn insert_quiz(&self, quiz: Quiz) {
        self.state().quizzes.insert(quiz.id, quiz);
    }

    pub fn insert_question(&self, question: Question) {
        let mut state = self.state();
        state.questions.retain(|q| q.id != question.id);
        state.questions.push(question);
    }

    /// Places a question in a student's boxes at an explicit level, replacing any prior entry.
    pub fn insert_box_entry(&self, entry: BoxEntry) {
        self.state()
            .boxes
            .insert((entry.student_id, entry.classroom_id, entry.question_id), entry);
    }

    pub fn enroll(&self, classroom_id: Uuid, student_id: Uuid) {
        self.state().enrollments.insert((classroom_id, student_id));
    }

    /// Removes a student from a classroom along with their boxes there.
    pub fn unenroll(&self, classroom_id: Uuid, student_id: Uuid) {
        let mut state = self.state();
        state.enrollments.remove(&(classroom_id, student_id));
        state
            .boxes
            .retain(|(student, classroom, _), _| !(*student == student_id && *classroom == classroom_id));
    }

    pub fn quiz_completion_count(&self, student_id: Uuid, quiz_id: Uuid) -> usize {
        self.state()
            .quiz_completions
            .iter()
            .filter(|record| **record == (student_id, quiz_id))
            .count()
    }
}

fn not_found(what: &str, id: Uuid) -> PortError {
    PortError::NotFound(format!("{what} {id} not found"))
}

#[async_trait]
impl CatalogService for InMemoryStore {
    async fn get_quiz(&self, quiz_id: Uuid) -> PortResult<Quiz> {
        self.state().quizzes.get(&quiz_id).cloned().ok_or_else(|| not_found("Quiz", quiz_id))
    }

    async fn get_module(&self, module_id: Uuid) -> PortResult<Module> {
        self.state()
            .modules
            .get(&module_id)
            .cloned()
            .ok_or_else(|| not_found("Module", module_id))
    }

    async fn get_question(&self, question_id: Uuid) -> PortResult<Question> {
        self.state()
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .cloned()
            .ok_or_else(|| not_found("Question", question_id))
    }

    async fn questions_for_quiz(&self, quiz_id: Uuid) -> PortResult<Vec<Question>> {
        Ok(self.state().questions.iter().filter(|q| q.quiz_id == quiz_id).cloned().collect())
    }

    async fn quizzes_in_module(&self, module_id: Uuid) -> PortResult<Vec<Quiz>> {
        Ok(self.state().quizzes.values().filter(|q| q.module_id == module_id).cloned().collect())
    }

    async fn delete_question(&self, question_id: Uuid) -> PortResult<()> {
        let mut state = self.state();
        let before = state.questions.len();
        state.questions.retain(|q| q.id != question_id);
        if state.questions.len() == before {
            return Err(not_found("Question", question_id));
        }
        state.answers.retain(|a| a.question_id != question_id);
        state.boxes.retain(|(_, _, question), _| *question != question_id);
        Ok(())
    }

    async fn prerequisite_edges(
        &self,
        kind: SubjectKind,
        classroom_id: Uuid,
    ) -> PortResult<HashMap<Uuid, Uuid>> {
        let state = self.state();
        let edges = match kind {
            SubjectKind::Quiz => state
                .quizzes
                .values()
                .filter(|q| q.classroom_id == classroom_id)
                .filter_map(|q| q.prerequisite_id.map(|p| (q.id, p)))
                .collect(),
            SubjectKind::Module => state
                .modules
                .values()
                .filter(|m| m.classroom_id == classroom_id)
                .filter_map(|m| m.prerequisite_id.map(|p| (m.id, p)))
                .collect(),
        };
        Ok(edges)
    }

    async fn set_prerequisite(
        &self,
        kind: SubjectKind,
        subject_id: Uuid,
        prerequisite_id: Option<Uuid>,
    ) -> PortResult<()> {
        let mut state = self.state();
        let slot = match kind {
            SubjectKind::Quiz => state.quizzes.get_mut(&subject_id).map(|q| &mut q.prerequisite_id),
            SubjectKind::Module => state.modules.get_mut(&subject_id).map(|m| &mut m.prerequisite_id),
        };
        match slot {
            Some(slot) => {
                *slot = prerequisite_id;
                Ok(())
            }
            None => Err(not_found(&kind.to_string(), subject_id)),
        }
    }
}

#[async_trait]
impl MembershipService for InMemoryStore {
    async fn is_classroom_member(&self, classroom_id: Uuid, student_id: Uuid) -> PortResult<bool> {
        Ok(self.state().enrollments.contains(&(classroom_id, student_id)))
    }
}

#[async_trait]
impl ProgressStore for InMemoryStore {
    async fn create_session(&self, session: &Session) -> PortResult<()> {
        let mut state = self.state();
        if state.sessions.contains_key(&session.id) {
            return Err(PortError::Conflict(format!("Session {} already exists", session.id)));
        }
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        self.state()
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| not_found("Session", session_id))
    }

    async fn abandon_session(&self, session_id: Uuid) -> PortResult<bool> {
        let mut state = self.state();
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| not_found("Session", session_id))?;
        if session.status != SessionStatus::InProgress {
            return Ok(false);
        }
        session.status = SessionStatus::Abandoned;
        Ok(true)
    }

    async fn commit_finish(&self, commit: &FinishCommit) -> PortResult<Option<FinishReceipt>> {
        let mut state = self.state();
        let State { sessions, boxes, enrollments, quiz_completions, module_completions, .. } = &mut *state;

        let session = sessions
            .get_mut(&commit.session_id)
            .ok_or_else(|| not_found("Session", commit.session_id))?;
        if session.status != SessionStatus::InProgress {
            return Ok(None);
        }
        session.status = SessionStatus::Completed;
        session.completed_at = Some(commit.completed_at);
        session.outcome = Some(commit.outcome);
        let (student_id, classroom_id) = (session.student_id, session.classroom_id);

        for (question_id, level) in &commit.box_updates {
            if let Some(entry) = boxes.get_mut(&(student_id, classroom_id, *question_id)) {
                entry.level = *level;
                entry.last_reviewed_at = Some(commit.completed_at);
            }
        }

        let mut receipt = FinishReceipt::default();
        let Some(pass) = &commit.pass else {
            return Ok(Some(receipt));
        };

        if !quiz_completions.contains(&(student_id, pass.quiz_id)) {
            quiz_completions.push((student_id, pass.quiz_id));
            receipt.quiz_completed = true;
        }

        // Boxes only exist for current members.
        let enrolled = enrollments.contains(&(classroom_id, student_id));
        for &question_id in pass.seed_question_ids.iter().filter(|_| enrolled) {
            boxes.entry((student_id, classroom_id, question_id)).or_insert_with(|| {
                receipt.seeded += 1;
                BoxEntry {
                    student_id,
                    classroom_id,
                    question_id,
                    level: BoxLevel::FIRST,
                    added_at: commit.completed_at,
                    last_reviewed_at: None,
                }
            });
        }

        let module_done = pass
            .gating_quiz_ids
            .iter()
            .all(|quiz_id| quiz_completions.contains(&(student_id, *quiz_id)));
        if module_done && !module_completions.contains(&(student_id, pass.module_id)) {
            module_completions.push((student_id, pass.module_id));
            receipt.module_completed = true;
        }
        Ok(Some(receipt))
    }

    async fn completed_quiz_sessions(
        &self,
        student_id: Uuid,
        quiz_id: Uuid,
    ) -> PortResult<Vec<Session>> {
        Ok(self
            .state()
            .sessions
            .values()
            .filter(|s| {
                s.student_id == student_id
                    && s.quiz_id() == Some(quiz_id)
                    && s.status == SessionStatus::Completed
            })
            .cloned()
            .collect())
    }

    async fn insert_answer(&self, answer: &SessionAnswer) -> PortResult<()> {
        let mut state = self.state();
        if state
            .answers
            .iter()
            .any(|a| a.session_id == answer.session_id && a.question_id == answer.question_id)
        {
            return Err(PortError::Conflict(format!(
                "Question {} already answered in session {}",
                answer.question_id, answer.session_id
            )));
        }
        state.answers.push(answer.clone());
        Ok(())
    }

    async fn answers_for_session(&self, session_id: Uuid) -> PortResult<Vec<SessionAnswer>> {
        Ok(self.state().answers.iter().filter(|a| a.session_id == session_id).cloned().collect())
    }

    async fn box_entries(&self, student_id: Uuid, classroom_id: Uuid) -> PortResult<Vec<BoxEntry>> {
        Ok(self
            .state()
            .boxes
            .values()
            .filter(|e| e.student_id == student_id && e.classroom_id == classroom_id)
            .cloned()
            .collect())
    }

    async fn get_box_entry(
        &self,
        student_id: Uuid,
        classroom_id: Uuid,
        question_id: Uuid,
    ) -> PortResult<Option<BoxEntry>> {
        Ok(self.state().boxes.get(&(student_id, classroom_id, question_id)).cloned())
    }

    async fn has_completed_quiz(&self, student_id: Uuid, quiz_id: Uuid) -> PortResult<bool> {
        Ok(self.state().quiz_completions.contains(&(student_id, quiz_id)))
    }

    async fn has_completed_module(&self, student_id: Uuid, module_id: Uuid) -> PortResult<bool> {
        Ok(self.state().module_completions.contains(&(student_id, module_id)))
    }
}
