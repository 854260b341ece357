//! Entity model for the questionnaire arena.
//!
//! Ownership is strictly hierarchical and expressed through parent-id
//! back-references rather than in-memory pointer graphs:
//! a Questionnaire owns Questions and Branchings, a Question owns Answers,
//! a Branching owns Conditions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type QuestionnaireId = Uuid;
pub type QuestionId = Uuid;
pub type AnswerId = Uuid;
pub type BranchingId = Uuid;
pub type ConditionId = Uuid;

/// Lifecycle state of a questionnaire.
///
/// Deletion is a status transition, never a physical delete. `Private` is a
/// legacy value: stored rows carrying it stay readable, but no transition
/// ever assigns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionnaireStatus {
    Draft,
    Published,
    Archived,
    Deleted,
    Private,
}

impl QuestionnaireStatus {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Draft goes live via Published; Published and Archived toggle; every
    /// non-deleted state can be soft-deleted. `Deleted` is terminal.
    pub fn can_transition(self, next: QuestionnaireStatus) -> bool {
        use QuestionnaireStatus::*;
        match (self, next) {
            (Deleted, _) => false,
            (_, Deleted) => true,
            (Draft, Published) => true,
            (Published, Archived) => true,
            (Archived, Published) => true,
            // Legacy rows migrate forward only.
            (Private, Published) | (Private, Archived) => true,
            _ => false,
        }
    }

    /// Stable lowercase name, matching the wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionnaireStatus::Draft => "draft",
            QuestionnaireStatus::Published => "published",
            QuestionnaireStatus::Archived => "archived",
            QuestionnaireStatus::Deleted => "deleted",
            QuestionnaireStatus::Private => "private",
        }
    }
}

impl std::str::FromStr for QuestionnaireStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(QuestionnaireStatus::Draft),
            "published" => Ok(QuestionnaireStatus::Published),
            "archived" => Ok(QuestionnaireStatus::Archived),
            "deleted" => Ok(QuestionnaireStatus::Deleted),
            "private" => Ok(QuestionnaireStatus::Private),
            other => Err(format!("unknown questionnaire status: {other}")),
        }
    }
}

/// How a question presents its answer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    Dropdown,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::SingleChoice => "singlechoice",
            QuestionKind::MultipleChoice => "multiplechoice",
            QuestionKind::Dropdown => "dropdown",
        }
    }
}

impl std::str::FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "singlechoice" => Ok(QuestionKind::SingleChoice),
            "multiplechoice" => Ok(QuestionKind::MultipleChoice),
            "dropdown" => Ok(QuestionKind::Dropdown),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

/// Terminal target of a navigation step: another question or an external URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Destination {
    #[serde(rename_all = "camelCase")]
    Question { question_id: QuestionId },
    #[serde(rename_all = "camelCase")]
    External { url: String },
}

/// Top-level container of questions and branching rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: QuestionnaireId,
    pub title: String,
    pub description: Option<String>,
    pub status: QuestionnaireStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Questionnaire {
    /// A fresh questionnaire starts life as a draft.
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description,
            status: QuestionnaireStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single prompt with an ordered position and answer options.
///
/// `order` is 1-based within the owning questionnaire and is the only
/// default-navigation signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub questionnaire_id: QuestionnaireId,
    pub order: i32,
    pub content: String,
    pub description: Option<String>,
    pub kind: QuestionKind,
}

/// A selectable option for a question, optionally pointing at a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub content: String,
    pub description: Option<String>,
    pub destination: Option<Destination>,
}

/// A named rule grouping conditions that redirect flow.
///
/// Declaration order (`created_at`, then id) is the precedence order when
/// several rules match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branching {
    pub id: BranchingId,
    pub questionnaire_id: QuestionnaireId,
    pub title: String,
    pub description: Option<String>,
    pub destination: Destination,
    pub created_at: DateTime<Utc>,
}

/// A predicate over one question's selected answers.
///
/// Satisfied when the stored answer-id set intersects the selected set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub branching_id: BranchingId,
    pub question_id: QuestionId,
    pub answer_ids: Vec<AnswerId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use QuestionnaireStatus::*;

        assert!(Draft.can_transition(Published));
        assert!(Published.can_transition(Archived));
        assert!(Archived.can_transition(Published));
        assert!(Draft.can_transition(Deleted));
        assert!(Published.can_transition(Deleted));
        assert!(Private.can_transition(Published));

        assert!(!Deleted.can_transition(Published));
        assert!(!Deleted.can_transition(Deleted));
        assert!(!Published.can_transition(Draft));
        assert!(!Draft.can_transition(Archived));
        assert!(!Published.can_transition(Private));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        use QuestionnaireStatus::*;
        for status in [Draft, Published, Archived, Deleted, Private] {
            assert_eq!(status.as_str().parse::<QuestionnaireStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_destination_wire_shape() {
        let dest = Destination::Question {
            question_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&dest).unwrap();
        assert_eq!(json["kind"], "question");
        assert!(json["questionId"].is_string());

        let dest = Destination::External {
            url: "https://example.org/done".into(),
        };
        let json = serde_json::to_value(&dest).unwrap();
        assert_eq!(json["kind"], "external");
        assert_eq!(json["url"], "https://example.org/done");
    }
}
