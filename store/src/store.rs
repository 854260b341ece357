//! The `QuestionnaireStore` trait - the seam between the service layer and
//! any storage backend.
//!
//! Every method is one logical operation against the store; there is no
//! cross-call shared state and no caching. `fetch_*` methods return
//! `Ok(None)` for unknown ids; `update_*`/`delete_*` return
//! `StoreError::NoRows` when the target row is missing.

use async_trait::async_trait;

use formway_core::model::{
    Answer, AnswerId, Branching, BranchingId, Condition, ConditionId, Question, QuestionId,
    Questionnaire, QuestionnaireId, QuestionnaireStatus,
};
use formway_core::navigation::NavigationSnapshot;

use crate::error::StoreResult;

#[async_trait]
pub trait QuestionnaireStore: Send + Sync + 'static {
    /// Backend health check.
    async fn ping(&self) -> StoreResult<()>;

    // ============== Questionnaires ==============

    async fn insert_questionnaire(&self, questionnaire: &Questionnaire) -> StoreResult<()>;

    async fn fetch_questionnaire(
        &self,
        id: QuestionnaireId,
    ) -> StoreResult<Option<Questionnaire>>;

    /// List questionnaires, newest first. `status` narrows to one lifecycle
    /// state; without it, soft-deleted rows are excluded.
    async fn list_questionnaires(
        &self,
        status: Option<QuestionnaireStatus>,
    ) -> StoreResult<Vec<Questionnaire>>;

    async fn update_questionnaire(&self, questionnaire: &Questionnaire) -> StoreResult<()>;

    // ============== Questions ==============

    async fn insert_question(&self, question: &Question) -> StoreResult<()>;

    async fn fetch_question(&self, id: QuestionId) -> StoreResult<Option<Question>>;

    /// Questions of one questionnaire, ascending by position.
    async fn list_questions(&self, questionnaire_id: QuestionnaireId)
        -> StoreResult<Vec<Question>>;

    async fn update_question(&self, question: &Question) -> StoreResult<()>;

    async fn delete_question(&self, id: QuestionId) -> StoreResult<()>;

    /// Rewrite the positions of a questionnaire's questions to 1..n in the
    /// given sequence, atomically.
    async fn reorder_questions(
        &self,
        questionnaire_id: QuestionnaireId,
        ordered: &[QuestionId],
    ) -> StoreResult<()>;

    // ============== Answers ==============

    async fn insert_answer(&self, answer: &Answer) -> StoreResult<()>;

    async fn fetch_answer(&self, id: AnswerId) -> StoreResult<Option<Answer>>;

    /// Answers of one question, in declaration order.
    async fn list_answers(&self, question_id: QuestionId) -> StoreResult<Vec<Answer>>;

    async fn update_answer(&self, answer: &Answer) -> StoreResult<()>;

    async fn delete_answer(&self, id: AnswerId) -> StoreResult<()>;

    // ============== Branchings ==============

    async fn insert_branching(&self, branching: &Branching) -> StoreResult<()>;

    async fn fetch_branching(&self, id: BranchingId) -> StoreResult<Option<Branching>>;

    /// Branching rules of one questionnaire, in declaration order.
    async fn list_branchings(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> StoreResult<Vec<Branching>>;

    async fn update_branching(&self, branching: &Branching) -> StoreResult<()>;

    /// Deleting a branching removes its conditions with it.
    async fn delete_branching(&self, id: BranchingId) -> StoreResult<()>;

    // ============== Conditions ==============

    async fn insert_condition(&self, condition: &Condition) -> StoreResult<()>;

    async fn fetch_condition(&self, id: ConditionId) -> StoreResult<Option<Condition>>;

    /// Conditions of one branching, in declaration order.
    async fn list_conditions(&self, branching_id: BranchingId) -> StoreResult<Vec<Condition>>;

    async fn update_condition(&self, condition: &Condition) -> StoreResult<()>;

    async fn delete_condition(&self, id: ConditionId) -> StoreResult<()>;

    // ============== Navigation ==============

    /// Load everything one resolution step needs: the current question, its
    /// answers, the questionnaire's branching rules with their conditions,
    /// and the ordered question list. Returns `Ok(None)` when the question
    /// does not exist or does not belong to the questionnaire.
    async fn load_navigation(
        &self,
        questionnaire_id: QuestionnaireId,
        question_id: QuestionId,
    ) -> StoreResult<Option<NavigationSnapshot>>;
}
