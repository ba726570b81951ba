#![allow(dead_code)]

use chrono::Utc;
use progression_core::domain::{BoxEntry, BoxLevel, ChoiceOption, Module, Question, QuestionBody, Quiz, SubmittedAnswer};
use progression_core::{
    BoxScheduler, CatalogService, CurriculumService, InMemoryStore, LifecycleConfig,
    MembershipService, ProgressStore, SchedulerConfig, SessionManager,
};
use std::sync::Arc;
use uuid::Uuid;

/// A classroom with one module and one enrolled student.
pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub manager: SessionManager,
    pub curriculum: CurriculumService,
    pub classroom_id: Uuid,
    pub module_id: Uuid,
    pub student_id: Uuid,
}

/// A single-choice question and its option ids.
pub struct ChoiceIds {
    pub question_id: Uuid,
    pub correct: Uuid,
    pub wrong: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let catalog: Arc<dyn CatalogService> = store.clone();
        let members: Arc<dyn MembershipService> = store.clone();
        let progress: Arc<dyn ProgressStore> = store.clone();

        let manager = SessionManager::new(
            catalog.clone(),
            members.clone(),
            progress.clone(),
            BoxScheduler::new(SchedulerConfig::default()),
            LifecycleConfig::default(),
        );
        let curriculum = CurriculumService::new(catalog, members, progress);

        let classroom_id = Uuid::new_v4();
        let student_id = Uuid::new_v4();
        let module_id = Uuid::new_v4();
        store.insert_module(Module {
            id: module_id,
            classroom_id,
            name: "Anatomy".into(),
            prerequisite_id: None,
        });
        store.enroll(classroom_id, student_id);

        Self { store, manager, curriculum, classroom_id, module_id, student_id }
    }

    pub fn add_module(&self, prerequisite_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_module(Module {
            id,
            classroom_id: self.classroom_id,
            name: "Module".into(),
            prerequisite_id,
        });
        id
    }

    pub fn add_quiz(&self, pass_threshold: u32, prerequisite_id: Option<Uuid>) -> Uuid {
        self.add_quiz_in(self.module_id, pass_threshold, prerequisite_id)
    }

    pub fn add_quiz_in(&self, module_id: Uuid, pass_threshold: u32, prerequisite_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_quiz(Quiz {
            id,
            module_id,
            classroom_id: self.classroom_id,
            title: "Bones of the foot".into(),
            is_active: true,
            pass_threshold,
            prerequisite_id,
        });
        id
    }

    pub fn add_choice_question(&self, quiz_id: Uuid) -> ChoiceIds {
        let ids = ChoiceIds {
            question_id: Uuid::new_v4(),
            correct: Uuid::new_v4(),
            wrong: Uuid::new_v4(),
        };
        self.store.insert_question(Question {
            id: ids.question_id,
            quiz_id,
            content_text: "Which bone forms the heel?".into(),
            explanation: Some("The calcaneus is the heel bone.".into()),
            media_ref: None,
            body: QuestionBody::ChoiceSingle {
                options: vec![
                    ChoiceOption { id: ids.correct, text: "Calcaneus".into(), is_correct: true },
                    ChoiceOption { id: ids.wrong, text: "Talus".into(), is_correct: false },
                ],
            },
        });
        ids
    }

    /// Places a question straight into the student's boxes at `level`.
    pub fn box_question(&self, question_id: Uuid, level: u8) {
        self.store.insert_box_entry(BoxEntry {
            student_id: self.student_id,
            classroom_id: self.classroom_id,
            question_id,
            level: BoxLevel::new(level).expect("valid level"),
            added_at: Utc::now(),
            last_reviewed_at: None,
        });
    }

    pub async fn box_level(&self, question_id: Uuid) -> Option<u8> {
        self.store
            .get_box_entry(self.student_id, self.classroom_id, question_id)
            .await
            .expect("box lookup")
            .map(|e| e.level.get())
    }

    /// Starts, answers every question correctly, and finishes a quiz session.
    pub async fn pass_quiz(&self, quiz_id: Uuid, questions: &[&ChoiceIds]) {
        let started = self.manager.start_standard_session(quiz_id, self.student_id).await.unwrap();
        for ids in questions {
            self.manager
                .submit_answer(started.session.id, self.student_id, ids.question_id, choose(ids.correct))
                .await
                .unwrap();
        }
        let outcome = self.manager.finish_session(started.session.id, self.student_id).await.unwrap();
        assert!(outcome.passed);
    }
}

pub fn choose(option_id: Uuid) -> SubmittedAnswer {
    SubmittedAnswer { selected_option_id: Some(option_id), ..Default::default() }
}
