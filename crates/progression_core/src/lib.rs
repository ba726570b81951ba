pub mod curriculum;
pub mod domain;
pub mod error;
pub mod evaluator;
pub mod lifecycle;
pub mod memory;
pub mod ports;
pub mod prerequisites;
pub mod scheduler;

pub use curriculum::{CurriculumService, ModuleStatus, QuizStatus};
pub use domain::{
    BoxEntry, BoxLevel, BoxMovement, BoxStatus, BoxTransition, Module, Question, QuestionBody,
    Quiz, Session, SessionAnswer, SessionKind, SessionOutcome, SessionStatus, SubjectKind,
    SubmittedAnswer,
};
pub use error::{ErrorKind, ProgressionError, ProgressionResult};
pub use lifecycle::{
    AnswerVerdict, LifecycleConfig, SessionManager, SessionReview, StartedSession,
};
pub use memory::InMemoryStore;
pub use ports::{
    CatalogService, FinishCommit, FinishReceipt, MembershipService, PassRecord, PortError,
    PortResult, ProgressStore,
};
pub use scheduler::{BoxScheduler, SchedulerConfig};
