//! crates/progression_core/src/curriculum.rs
//!
//! Prerequisite edits and live lock/completion status for quizzes and modules.

use std::sync::Arc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Module, Quiz, SessionStatus, SubjectKind};
use crate::error::{ProgressionError, ProgressionResult};
use crate::ports::{CatalogService, MembershipService, PortError, ProgressStore};
use crate::prerequisites::{self, DEFAULT_MAX_DEPTH};

//=========================================================================================
// Read Models
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizStatus {
    pub quiz_id: Uuid,
    pub locked: bool,
    pub completed: bool,
    pub attempts: u32,
    /// Best score among completed attempts, as a fraction of the maximum.
    pub best_ratio: Option<f64>,
    pub pass_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleStatus {
    pub module_id: Uuid,
    pub locked: bool,
    pub completed: bool,
    pub total_quizzes: u32,
    pub completed_quizzes: u32,
}

//=========================================================================================
// Shared lookups
//=========================================================================================

pub(crate) async fn load_quiz(catalog: &dyn CatalogService, quiz_id: Uuid) -> ProgressionResult<Quiz> {
    catalog.get_quiz(quiz_id).await.map_err(|e| match e {
        PortError::NotFound(_) => ProgressionError::QuizNotFound(quiz_id),
        other => other.into(),
    })
}

pub(crate) async fn load_module(
    catalog: &dyn CatalogService,
    module_id: Uuid,
) -> ProgressionResult<Module> {
    catalog.get_module(module_id).await.map_err(|e| match e {
        PortError::NotFound(_) => ProgressionError::ModuleNotFound(module_id),
        other => other.into(),
    })
}

pub(crate) async fn ensure_member(
    members: &dyn MembershipService,
    classroom_id: Uuid,
    student_id: Uuid,
) -> ProgressionResult<()> {
    if members.is_classroom_member(classroom_id, student_id).await? {
        Ok(())
    } else {
        Err(ProgressionError::NotEnrolled(classroom_id))
    }
}

pub(crate) async fn quiz_locked(
    store: &dyn ProgressStore,
    quiz: &Quiz,
    student_id: Uuid,
) -> ProgressionResult<bool> {
    let locked = prerequisites::is_locked(quiz.prerequisite_id, |id| {
        store.has_completed_quiz(student_id, id)
    })
    .await?;
    Ok(locked)
}

pub(crate) async fn module_locked(
    store: &dyn ProgressStore,
    module: &Module,
    student_id: Uuid,
) -> ProgressionResult<bool> {
    let locked = prerequisites::is_locked(module.prerequisite_id, |id| {
        store.has_completed_module(student_id, id)
    })
    .await?;
    Ok(locked)
}

//=========================================================================================
// The Service
//=========================================================================================

/// Administrator-side prerequisite edits and student-side status reads.
///
/// The cycle check and the following write are not atomic against other
/// concurrent edits; prerequisite edits are rare and administrator-only.
#[derive(Clone)]
pub struct CurriculumService {
    catalog: Arc<dyn CatalogService>,
    members: Arc<dyn MembershipService>,
    store: Arc<dyn ProgressStore>,
    max_depth: usize,
}

impl CurriculumService {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        members: Arc<dyn MembershipService>,
        store: Arc<dyn ProgressStore>,
    ) -> Self {
        Self { catalog, members, store, max_depth: DEFAULT_MAX_DEPTH }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub async fn set_quiz_prerequisite(
        &self,
        quiz_id: Uuid,
        prerequisite_id: Option<Uuid>,
    ) -> ProgressionResult<()> {
        let quiz = load_quiz(self.catalog.as_ref(), quiz_id).await?;
        if let Some(candidate) = prerequisite_id {
            if candidate != quiz_id {
                let prerequisite = load_quiz(self.catalog.as_ref(), candidate).await?;
                if prerequisite.classroom_id != quiz.classroom_id {
                    return Err(ProgressionError::InvalidPrerequisite(
                        "prerequisite quiz must be in the same classroom".into(),
                    ));
                }
            }
        }
        self.link(SubjectKind::Quiz, quiz_id, quiz.classroom_id, prerequisite_id).await
    }

    pub async fn set_module_prerequisite(
        &self,
        module_id: Uuid,
        prerequisite_id: Option<Uuid>,
    ) -> ProgressionResult<()> {
        let module = load_module(self.catalog.as_ref(), module_id).await?;
        if let Some(candidate) = prerequisite_id {
            if candidate != module_id {
                let prerequisite = load_module(self.catalog.as_ref(), candidate).await?;
                if prerequisite.classroom_id != module.classroom_id {
                    return Err(ProgressionError::InvalidPrerequisite(
                        "prerequisite module must be in the same classroom".into(),
                    ));
                }
            }
        }
        self.link(SubjectKind::Module, module_id, module.classroom_id, prerequisite_id).await
    }

    async fn link(
        &self,
        kind: SubjectKind,
        subject_id: Uuid,
        classroom_id: Uuid,
        prerequisite_id: Option<Uuid>,
    ) -> ProgressionResult<()> {
        if let Some(candidate) = prerequisite_id {
            if candidate == subject_id {
                warn!(%subject_id, "Rejected self-referencing {} prerequisite", kind);
                return Err(ProgressionError::CircularDependency(kind));
            }
            let edges = self.catalog.prerequisite_edges(kind, classroom_id).await?;
            if prerequisites::has_cycle(candidate, subject_id, self.max_depth, |id| {
                edges.get(&id).copied()
            }) {
                warn!(%subject_id, %candidate, "Rejected cyclic {} prerequisite", kind);
                return Err(ProgressionError::CircularDependency(kind));
            }
        }

        self.catalog.set_prerequisite(kind, subject_id, prerequisite_id).await?;
        info!(%subject_id, ?prerequisite_id, "Updated {} prerequisite", kind);
        Ok(())
    }

    pub async fn quiz_status(&self, quiz_id: Uuid, student_id: Uuid) -> ProgressionResult<QuizStatus> {
        let quiz = load_quiz(self.catalog.as_ref(), quiz_id).await?;
        ensure_member(self.members.as_ref(), quiz.classroom_id, student_id).await?;

        let locked = quiz_locked(self.store.as_ref(), &quiz, student_id).await?;
        let completed = self.store.has_completed_quiz(student_id, quiz_id).await?;
        let sessions = self.store.completed_quiz_sessions(student_id, quiz_id).await?;

        let best_ratio = sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .filter_map(|s| s.outcome)
            .filter(|o| o.max_score > 0)
            .map(|o| f64::from(o.score) / f64::from(o.max_score))
            .fold(None, |best: Option<f64>, ratio| Some(best.map_or(ratio, |b| b.max(ratio))));

        Ok(QuizStatus {
            quiz_id,
            locked,
            completed,
            attempts: sessions.len() as u32,
            best_ratio,
            pass_threshold: quiz.pass_threshold,
        })
    }

    pub async fn module_status(
        &self,
        module_id: Uuid,
        student_id: Uuid,
    ) -> ProgressionResult<ModuleStatus> {
        let module = load_module(self.catalog.as_ref(), module_id).await?;
        ensure_member(self.members.as_ref(), module.classroom_id, student_id).await?;

        let locked = module_locked(self.store.as_ref(), &module, student_id).await?;
        let completed = self.store.has_completed_module(student_id, module_id).await?;

        let quizzes = self.catalog.quizzes_in_module(module_id).await?;
        let mut completed_quizzes = 0;
        for quiz in &quizzes {
            if self.store.has_completed_quiz(student_id, quiz.id).await? {
                completed_quizzes += 1;
            }
        }

        Ok(ModuleStatus {
            module_id,
            locked,
            completed,
            total_quizzes: quizzes.len() as u32,
            completed_quizzes,
        })
    }
}
