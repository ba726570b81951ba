//! crates/progression_core/src/error.rs
//!
//! Business errors returned by the progression services.
//!
//! Only the lifecycle and curriculum services build these. The pure
//! components return plain values and leave the decision to them.

use uuid::Uuid;

use crate::domain::SubjectKind;
use crate::ports::PortError;

/// Coarse classification shared with the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    InvalidArgument,
    PreconditionFailed,
    CircularDependency,
    ResourceExhausted,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    #[error("quiz {0} not found")]
    QuizNotFound(Uuid),

    #[error("module {0} not found")]
    ModuleNotFound(Uuid),

    #[error("quiz {0} is not active")]
    QuizInactive(Uuid),

    #[error("quiz {0} is locked by its prerequisite")]
    QuizLocked(Uuid),

    #[error("module {0} is locked by its prerequisite")]
    ModuleLocked(Uuid),

    #[error("student is not enrolled in classroom {0}")]
    NotEnrolled(Uuid),

    #[error("quiz {0} has no questions")]
    NoQuestions(Uuid),

    #[error("{0} is not an allowed question count")]
    InvalidQuestionCount(u32),

    #[error("no questions available to build a session")]
    NoQuestionsAvailable,

    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error("session {0} is already finished")]
    SessionAlreadyFinished(Uuid),

    #[error("session {0} is not finished yet")]
    SessionNotFinished(Uuid),

    #[error("question {question_id} is not part of session {session_id}")]
    QuestionNotInSession { session_id: Uuid, question_id: Uuid },

    #[error("question {question_id} was already answered in session {session_id}")]
    DuplicateAnswer { session_id: Uuid, question_id: Uuid },

    #[error("caller does not own this resource")]
    Forbidden,

    #[error("setting this {0} prerequisite would create a cycle")]
    CircularDependency(SubjectKind),

    #[error("invalid prerequisite: {0}")]
    InvalidPrerequisite(String),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl ProgressionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProgressionError::QuizNotFound(_)
            | ProgressionError::ModuleNotFound(_)
            | ProgressionError::SessionNotFound(_) => ErrorKind::NotFound,

            ProgressionError::QuizInactive(_)
            | ProgressionError::QuizLocked(_)
            | ProgressionError::ModuleLocked(_)
            | ProgressionError::NotEnrolled(_)
            | ProgressionError::Forbidden => ErrorKind::Forbidden,

            ProgressionError::DuplicateAnswer { .. } => ErrorKind::Conflict,

            ProgressionError::InvalidQuestionCount(_)
            | ProgressionError::QuestionNotInSession { .. }
            | ProgressionError::InvalidPrerequisite(_) => ErrorKind::InvalidArgument,

            ProgressionError::SessionAlreadyFinished(_) | ProgressionError::SessionNotFinished(_) => {
                ErrorKind::PreconditionFailed
            }

            ProgressionError::CircularDependency(_) => ErrorKind::CircularDependency,

            ProgressionError::NoQuestions(_) | ProgressionError::NoQuestionsAvailable => {
                ErrorKind::ResourceExhausted
            }

            ProgressionError::Port(PortError::NotFound(_)) => ErrorKind::NotFound,
            ProgressionError::Port(PortError::Conflict(_)) => ErrorKind::Conflict,
            ProgressionError::Port(PortError::Unexpected(_)) => ErrorKind::Internal,
        }
    }
}

pub type ProgressionResult<T> = Result<T, ProgressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(
            ProgressionError::DuplicateAnswer { session_id: id, question_id: id }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ProgressionError::SessionAlreadyFinished(id).kind(),
            ErrorKind::PreconditionFailed
        );
        assert_eq!(ProgressionError::NoQuestionsAvailable.kind(), ErrorKind::ResourceExhausted);
        assert_eq!(
            ProgressionError::CircularDependency(SubjectKind::Quiz).kind(),
            ErrorKind::CircularDependency
        );
        assert_eq!(
            ProgressionError::from(PortError::Conflict("dup".into())).kind(),
            ErrorKind::Conflict
        );
    }
}
