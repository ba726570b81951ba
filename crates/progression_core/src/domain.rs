//! crates/progression_core/src/domain.rs
//!
//! Defines the pure, core data structures of the learning-progression engine.
//! These structs are independent of any database or transport format; the
//! serde derives exist so payloads can be stored verbatim for review.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// Leitner Box Levels
//=========================================================================================

/// A proficiency bucket, 1 (weakest) to 5 (strongest).
///
/// The only way to build one is through [`BoxLevel::new`] or the
/// transition helpers, so a value outside `1..=5` cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BoxLevel(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("box level {0} is outside 1..=5")]
pub struct InvalidBoxLevel(pub i64);

impl BoxLevel {
    pub const FIRST: BoxLevel = BoxLevel(1);
    pub const LAST: BoxLevel = BoxLevel(5);
    /// Number of boxes in the system.
    pub const COUNT: usize = 5;

    pub fn new(level: u8) -> Option<Self> {
        (1..=5).contains(&level).then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position, handy for `[T; BoxLevel::COUNT]` tables.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// All levels in ascending order.
    pub fn all() -> impl Iterator<Item = BoxLevel> {
        (1..=5).map(BoxLevel)
    }

    /// The level a question moves to after being answered.
    ///
    /// A correct answer climbs one box and stops at the last one; any miss
    /// sends the question back to box 1 whatever its prior level.
    pub fn after_answer(self, correct: bool) -> BoxLevel {
        if correct {
            BoxLevel((self.0 + 1).min(Self::LAST.0))
        } else {
            Self::FIRST
        }
    }
}

impl TryFrom<u8> for BoxLevel {
    type Error = InvalidBoxLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        BoxLevel::new(value).ok_or(InvalidBoxLevel(i64::from(value)))
    }
}

impl TryFrom<i16> for BoxLevel {
    type Error = InvalidBoxLevel;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(BoxLevel::new)
            .ok_or(InvalidBoxLevel(i64::from(value)))
    }
}

impl From<BoxLevel> for u8 {
    fn from(level: BoxLevel) -> Self {
        level.0
    }
}

impl std::fmt::Display for BoxLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Questions grouped by the box they currently sit in.
pub type Inventory = BTreeMap<BoxLevel, Vec<Uuid>>;

/// The box move computed once, when an answer is submitted in a Leitner session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxTransition {
    pub previous: BoxLevel,
    pub new: BoxLevel,
}

impl BoxTransition {
    pub fn for_verdict(previous: BoxLevel, correct: bool) -> Self {
        Self {
            previous,
            new: previous.after_answer(correct),
        }
    }

    pub fn is_promotion(&self) -> bool {
        self.new > self.previous
    }

    pub fn is_demotion(&self) -> bool {
        self.new < self.previous
    }
}

//=========================================================================================
// Questions
//=========================================================================================

/// One option of a choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: Uuid,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingPair {
    pub left_item: String,
    pub right_item: String,
}

/// A circular target area in image-relative coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageZone {
    pub label: String,
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRule {
    pub accepted_answer: String,
    pub case_sensitive: bool,
    pub ignore_spelling_errors: bool,
}

/// The type-specific payload of a question, including its correct answer.
///
/// True/false questions are a `ChoiceSingle` with two options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionBody {
    ChoiceSingle { options: Vec<ChoiceOption> },
    ChoiceMulti { options: Vec<ChoiceOption> },
    Matching { pairs: Vec<MatchingPair> },
    ImageZone { zones: Vec<ImageZone> },
    Text(TextRule),
}

/// Storage discriminant for [`QuestionBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    ChoiceSingle,
    ChoiceMulti,
    Matching,
    ImageZone,
    Text,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::ChoiceSingle => "CHOICE_SINGLE",
            QuestionKind::ChoiceMulti => "CHOICE_MULTI",
            QuestionKind::Matching => "MATCHING",
            QuestionKind::ImageZone => "IMAGE_ZONE",
            QuestionKind::Text => "TEXT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CHOICE_SINGLE" | "VRAI_FAUX" => Some(QuestionKind::ChoiceSingle),
            "CHOICE_MULTI" => Some(QuestionKind::ChoiceMulti),
            "MATCHING" => Some(QuestionKind::Matching),
            "IMAGE_ZONE" => Some(QuestionKind::ImageZone),
            "TEXT" => Some(QuestionKind::Text),
            _ => None,
        }
    }
}

impl QuestionBody {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionBody::ChoiceSingle { .. } => QuestionKind::ChoiceSingle,
            QuestionBody::ChoiceMulti { .. } => QuestionKind::ChoiceMulti,
            QuestionBody::Matching { .. } => QuestionKind::Matching,
            QuestionBody::ImageZone { .. } => QuestionKind::ImageZone,
            QuestionBody::Text(_) => QuestionKind::Text,
        }
    }
}

/// A published question. Owned by exactly one quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub content_text: String,
    pub explanation: Option<String>,
    pub media_ref: Option<Uuid>,
    pub body: QuestionBody,
}

//=========================================================================================
// Submitted Answers
//=========================================================================================

/// A click on an image. Either coordinate may be missing in a malformed payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickPoint {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// The raw answer a student sends. Every field is optional; the evaluator
/// reads only the one that matters for the question's kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmittedAnswer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option_ids: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairs: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicked_coordinates: Option<ClickPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_answer: Option<String>,
}

//=========================================================================================
// Curriculum
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    pub id: Uuid,
    pub module_id: Uuid,
    pub classroom_id: Uuid,
    pub title: String,
    pub is_active: bool,
    /// Minimum number of correct answers to pass. Zero means the quiz does not gate its module.
    pub pass_threshold: u32,
    pub prerequisite_id: Option<Uuid>,
}

impl Quiz {
    pub fn is_gating(&self) -> bool {
        self.pass_threshold > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub id: Uuid,
    pub classroom_id: Uuid,
    pub name: String,
    pub prerequisite_id: Option<Uuid>,
}

/// Which prerequisite forest an edge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    Quiz,
    Module,
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubjectKind::Quiz => write!(f, "quiz"),
            SubjectKind::Module => write!(f, "module"),
        }
    }
}

//=========================================================================================
// Sessions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Abandoned => "ABANDONED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IN_PROGRESS" => Some(SessionStatus::InProgress),
            "COMPLETED" => Some(SessionStatus::Completed),
            "ABANDONED" => Some(SessionStatus::Abandoned),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

/// What a session is an attempt at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionKind {
    /// A fixed quiz; the question set is exactly the quiz's questions.
    Standard { quiz_id: Uuid },
    /// A Leitner review over the student's classroom inventory.
    Leitner { requested_count: u32 },
}

/// A question drawn into a session. Leitner sessions snapshot the box level
/// at selection time so later box moves are computed against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionQuestion {
    pub question_id: Uuid,
    pub previous_box: Option<BoxLevel>,
}

/// Box movement summary of a finished Leitner session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxMovement {
    pub promoted: u32,
    pub demoted: u32,
}

/// Everything written to a session at finish time, and only then.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub score: u32,
    pub max_score: u32,
    pub answered: u32,
    pub passed: bool,
    pub box_movement: Option<BoxMovement>,
}

impl SessionOutcome {
    pub fn wrong(&self) -> u32 {
        self.answered.saturating_sub(self.score)
    }
}

/// One attempt at a quiz or a Leitner review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub student_id: Uuid,
    pub classroom_id: Uuid,
    pub kind: SessionKind,
    pub status: SessionStatus,
    pub questions: Vec<SessionQuestion>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: Option<SessionOutcome>,
}

impl Session {
    pub fn is_leitner(&self) -> bool {
        matches!(self.kind, SessionKind::Leitner { .. })
    }

    pub fn quiz_id(&self) -> Option<Uuid> {
        match self.kind {
            SessionKind::Standard { quiz_id } => Some(quiz_id),
            SessionKind::Leitner { .. } => None,
        }
    }

    pub fn question(&self, question_id: Uuid) -> Option<&SessionQuestion> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }

    /// Whether the session has outlived `ttl` as of `now`. Data-driven, not a timer.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.started_at > ttl
    }
}

/// The single stored answer for one (session, question) pair. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAnswer {
    pub session_id: Uuid,
    pub question_id: Uuid,
    pub is_correct: bool,
    pub answer: SubmittedAnswer,
    pub transition: Option<BoxTransition>,
    pub answered_at: DateTime<Utc>,
}

//=========================================================================================
// Leitner Inventory
//=========================================================================================

/// A question's position in one student's Leitner boxes for one classroom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxEntry {
    pub student_id: Uuid,
    pub classroom_id: Uuid,
    pub question_id: Uuid,
    pub level: BoxLevel,
    pub added_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

/// Groups box entries into an [`Inventory`].
pub fn group_by_level(entries: &[BoxEntry]) -> Inventory {
    let mut inventory = Inventory::new();
    for entry in entries {
        inventory.entry(entry.level).or_default().push(entry.question_id);
    }
    inventory
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSummary {
    pub level: BoxLevel,
    pub question_count: u32,
    pub percentage: f64,
    pub selection_weight: f64,
}

/// Per-box counts for one student in one classroom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxStatus {
    pub classroom_id: Uuid,
    pub total_questions: u32,
    pub boxes: Vec<BoxSummary>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl BoxStatus {
    pub fn from_entries(
        classroom_id: Uuid,
        entries: &[BoxEntry],
        weights: &[f64; BoxLevel::COUNT],
    ) -> Self {
        let mut counts = [0u32; BoxLevel::COUNT];
        for entry in entries {
            counts[entry.level.index()] += 1;
        }
        let total: u32 = counts.iter().sum();

        let boxes = BoxLevel::all()
            .map(|level| {
                let count = counts[level.index()];
                BoxSummary {
                    level,
                    question_count: count,
                    percentage: if total > 0 {
                        f64::from(count) / f64::from(total) * 100.0
                    } else {
                        0.0
                    },
                    selection_weight: weights[level.index()],
                }
            })
            .collect();

        Self {
            classroom_id,
            total_questions: total,
            boxes,
            last_reviewed_at: entries.iter().filter_map(|e| e.last_reviewed_at).max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_level_rejects_out_of_range() {
        assert!(BoxLevel::new(0).is_none());
        assert!(BoxLevel::new(6).is_none());
        assert!(BoxLevel::try_from(-1i16).is_err());
        assert_eq!(BoxLevel::try_from(3i16).map(u8::from), Ok(3));
    }

    #[test]
    fn stored_type_names_parse_back_to_kinds() {
        for kind in [
            QuestionKind::ChoiceSingle,
            QuestionKind::ChoiceMulti,
            QuestionKind::Matching,
            QuestionKind::ImageZone,
            QuestionKind::Text,
        ] {
            assert_eq!(QuestionKind::parse(kind.as_str()), Some(kind));
        }
        // Legacy true/false rows are single-choice questions.
        assert_eq!(QuestionKind::parse("VRAI_FAUX"), Some(QuestionKind::ChoiceSingle));
        assert_eq!(QuestionKind::parse("ESSAY"), None);
    }

    #[test]
    fn correct_answer_climbs_one_box_and_stops_at_five() {
        let three = BoxLevel::new(3).unwrap();
        assert_eq!(three.after_answer(true).get(), 4);
        assert_eq!(BoxLevel::LAST.after_answer(true), BoxLevel::LAST);
    }

    #[test]
    fn any_miss_resets_to_first_box() {
        for level in BoxLevel::all() {
            assert_eq!(level.after_answer(false), BoxLevel::FIRST);
        }
    }

    #[test]
    fn transition_direction() {
        let t = BoxTransition::for_verdict(BoxLevel::new(2).unwrap(), true);
        assert!(t.is_promotion() && !t.is_demotion());

        let top = BoxTransition::for_verdict(BoxLevel::LAST, true);
        assert!(!top.is_promotion() && !top.is_demotion());

        let first_miss = BoxTransition::for_verdict(BoxLevel::FIRST, false);
        assert!(!first_miss.is_demotion());
    }

    #[test]
    fn box_level_deserializes_only_valid_values() {
        assert!(serde_json::from_str::<BoxLevel>("4").is_ok());
        assert!(serde_json::from_str::<BoxLevel>("9").is_err());
    }

    #[test]
    fn box_status_percentages() {
        let now = Utc::now();
        let classroom = Uuid::new_v4();
        let entry = |level: u8| BoxEntry {
            student_id: Uuid::nil(),
            classroom_id: classroom,
            question_id: Uuid::new_v4(),
            level: BoxLevel::new(level).unwrap(),
            added_at: now,
            last_reviewed_at: None,
        };
        let entries = vec![entry(1), entry(1), entry(1), entry(4)];
        let status = BoxStatus::from_entries(classroom, &entries, &[0.5, 0.25, 0.15, 0.07, 0.03]);

        assert_eq!(status.total_questions, 4);
        assert_eq!(status.boxes[0].question_count, 3);
        assert!((status.boxes[0].percentage - 75.0).abs() < f64::EPSILON);
        assert!((status.boxes[3].percentage - 25.0).abs() < f64::EPSILON);
        assert_eq!(status.boxes[4].question_count, 0);
        assert!(status.last_reviewed_at.is_none());
    }
}
