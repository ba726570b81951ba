mod common;

use async_trait::async_trait;
use common::{choose, Fixture};
use progression_core::domain::{BoxEntry, Session, SessionAnswer};
use progression_core::{
    BoxScheduler, CatalogService, ErrorKind, FinishCommit, FinishReceipt, InMemoryStore,
    LifecycleConfig, MembershipService, PortError, PortResult, ProgressStore, SchedulerConfig,
    SessionManager, SessionStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Delegates to the in-memory store but drops the connection on the first finish.
struct FlakyFinish {
    inner: Arc<InMemoryStore>,
    fail_next: AtomicBool,
}

#[async_trait]
impl ProgressStore for FlakyFinish {
    async fn create_session(&self, session: &Session) -> PortResult<()> {
        self.inner.create_session(session).await
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<Session> {
        self.inner.get_session(session_id).await
    }

    async fn abandon_session(&self, session_id: Uuid) -> PortResult<bool> {
        self.inner.abandon_session(session_id).await
    }

    async fn commit_finish(&self, commit: &FinishCommit) -> PortResult<Option<FinishReceipt>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PortError::Unexpected("connection reset by peer".into()));
        }
        self.inner.commit_finish(commit).await
    }

    async fn completed_quiz_sessions(&self, student_id: Uuid, quiz_id: Uuid) -> PortResult<Vec<Session>> {
        self.inner.completed_quiz_sessions(student_id, quiz_id).await
    }

    async fn insert_answer(&self, answer: &SessionAnswer) -> PortResult<()> {
        self.inner.insert_answer(answer).await
    }

    async fn answers_for_session(&self, session_id: Uuid) -> PortResult<Vec<SessionAnswer>> {
        self.inner.answers_for_session(session_id).await
    }

    async fn box_entries(&self, student_id: Uuid, classroom_id: Uuid) -> PortResult<Vec<BoxEntry>> {
        self.inner.box_entries(student_id, classroom_id).await
    }

    async fn get_box_entry(
        &self,
        student_id: Uuid,
        classroom_id: Uuid,
        question_id: Uuid,
    ) -> PortResult<Option<BoxEntry>> {
        self.inner.get_box_entry(student_id, classroom_id, question_id).await
    }

    async fn has_completed_quiz(&self, student_id: Uuid, quiz_id: Uuid) -> PortResult<bool> {
        self.inner.has_completed_quiz(student_id, quiz_id).await
    }

    async fn has_completed_module(&self, student_id: Uuid, module_id: Uuid) -> PortResult<bool> {
        self.inner.has_completed_module(student_id, module_id).await
    }
}

fn flaky_manager(fx: &Fixture) -> SessionManager {
    let catalog: Arc<dyn CatalogService> = fx.store.clone();
    let members: Arc<dyn MembershipService> = fx.store.clone();
    let progress: Arc<dyn ProgressStore> =
        Arc::new(FlakyFinish { inner: fx.store.clone(), fail_next: AtomicBool::new(true) });
    SessionManager::new(
        catalog,
        members,
        progress,
        BoxScheduler::new(SchedulerConfig::default()),
        LifecycleConfig::default(),
    )
}

#[tokio::test]
async fn failed_finish_leaves_the_session_open_for_a_retry() {
    let fx = Fixture::new();
    let quiz_id = fx.add_quiz(1, None);
    let q = fx.add_choice_question(quiz_id);
    let next_quiz = fx.add_quiz(1, Some(quiz_id));
    fx.add_choice_question(next_quiz);
    let manager = flaky_manager(&fx);

    let started = manager.start_standard_session(quiz_id, fx.student_id).await.unwrap();
    let session_id = started.session.id;
    manager.submit_answer(session_id, fx.student_id, q.question_id, choose(q.correct)).await.unwrap();

    let err = manager.finish_session(session_id, fx.student_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    // Nothing from the pass was written, and the session is still open.
    let session = fx.store.get_session(session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::InProgress);
    assert!(session.outcome.is_none());
    assert_eq!(fx.store.quiz_completion_count(fx.student_id, quiz_id), 0);
    assert_eq!(fx.box_level(q.question_id).await, None);

    let outcome = manager.finish_session(session_id, fx.student_id).await.unwrap();
    assert!(outcome.passed);
    assert_eq!(fx.store.quiz_completion_count(fx.student_id, quiz_id), 1);
    assert_eq!(fx.box_level(q.question_id).await, Some(1));
    assert!(!fx.store.has_completed_module(fx.student_id, fx.module_id).await.unwrap());
    manager.start_standard_session(next_quiz, fx.student_id).await.unwrap();
}

#[tokio::test]
async fn passing_the_last_gating_quiz_completes_the_module_in_the_same_finish() {
    let fx = Fixture::new();
    let quiz_id = fx.add_quiz(1, None);
    let q = fx.add_choice_question(quiz_id);

    fx.pass_quiz(quiz_id, &[&q]).await;

    assert!(fx.store.has_completed_quiz(fx.student_id, quiz_id).await.unwrap());
    assert!(fx.store.has_completed_module(fx.student_id, fx.module_id).await.unwrap());
}
