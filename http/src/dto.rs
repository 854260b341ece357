//! Wire DTOs.
//!
//! Every request and response body has an explicit camelCase shape here;
//! entities never cross the boundary directly. `Destination` and the
//! next-state exchange reuse the core wire types, which are already
//! camelCase-tagged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use formway_core::model::{
    Answer, AnswerId, Branching, Condition, Destination, Question, QuestionId, QuestionKind,
    Questionnaire, QuestionnaireId, QuestionnaireStatus,
};

// ============== Responses ==============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireDto {
    pub id: QuestionnaireId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: QuestionnaireStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Questionnaire> for QuestionnaireDto {
    fn from(q: Questionnaire) -> Self {
        Self {
            id: q.id,
            title: q.title,
            description: q.description,
            status: q.status,
            created_at: q.created_at,
            updated_at: q.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub id: QuestionId,
    pub questionnaire_id: QuestionnaireId,
    pub order: i32,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: QuestionKind,
}

impl From<Question> for QuestionDto {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            questionnaire_id: q.questionnaire_id,
            order: q.order,
            content: q.content,
            description: q.description,
            kind: q.kind,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDto {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
}

impl From<Answer> for AnswerDto {
    fn from(a: Answer) -> Self {
        Self {
            id: a.id,
            question_id: a.question_id,
            content: a.content,
            description: a.description,
            destination: a.destination,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionDto {
    pub id: uuid::Uuid,
    pub branching_id: uuid::Uuid,
    pub question_id: QuestionId,
    pub answer_ids: Vec<AnswerId>,
}

impl From<Condition> for ConditionDto {
    fn from(c: Condition) -> Self {
        Self {
            id: c.id,
            branching_id: c.branching_id,
            question_id: c.question_id,
            answer_ids: c.answer_ids,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchingDto {
    pub id: uuid::Uuid,
    pub questionnaire_id: QuestionnaireId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub destination: Destination,
    pub conditions: Vec<ConditionDto>,
    pub created_at: DateTime<Utc>,
}

impl BranchingDto {
    pub fn from_parts(branching: Branching, conditions: Vec<Condition>) -> Self {
        Self {
            id: branching.id,
            questionnaire_id: branching.questionnaire_id,
            title: branching.title,
            description: branching.description,
            destination: branching.destination,
            conditions: conditions.into_iter().map(ConditionDto::from).collect(),
            created_at: branching.created_at,
        }
    }
}

/// Error body: `{ "error": <kind>, "message": <detail> }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

// ============== Requests ==============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionnaireRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionnaireRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    pub status: QuestionnaireStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[serde(default)]
    pub order: Option<i32>,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: QuestionKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    pub order: i32,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: QuestionKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderQuestionsRequest {
    pub question_ids: Vec<QuestionId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnswerRequest {
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub destination: Option<Destination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnswerRequest {
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub destination: Option<Destination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchingRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub destination: Destination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBranchingRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub destination: Destination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConditionRequest {
    pub question_id: QuestionId,
    pub answer_ids: Vec<AnswerId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConditionRequest {
    pub question_id: QuestionId,
    pub answer_ids: Vec<AnswerId>,
}
