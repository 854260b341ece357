//! CRUD over the questionnaire entity hierarchy.
//!
//! All mutation flows through here. The service owns the rules the store
//! cannot express: the questionnaire lifecycle state machine, position
//! assignment for questions, and the cross-entity ownership checks
//! (a destination or condition may only reference rows of the same
//! questionnaire).

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use formway_core::model::{
    Answer, AnswerId, Branching, BranchingId, Condition, ConditionId, Destination, Question,
    QuestionId, QuestionKind, Questionnaire, QuestionnaireId, QuestionnaireStatus,
};
use formway_store::{QuestionnaireStore, StoreError};

use crate::result::{ServiceError, ServiceResult};

// ============== Operation inputs ==============

#[derive(Debug, Clone)]
pub struct NewQuestionnaire {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuestionnaireUpdate {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    /// 1-based position; assigned max+1 when absent.
    pub order: Option<i32>,
    pub content: String,
    pub description: Option<String>,
    pub kind: QuestionKind,
}

#[derive(Debug, Clone)]
pub struct QuestionUpdate {
    pub order: i32,
    pub content: String,
    pub description: Option<String>,
    pub kind: QuestionKind,
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub content: String,
    pub description: Option<String>,
    pub destination: Option<Destination>,
}

#[derive(Debug, Clone)]
pub struct AnswerUpdate {
    pub content: String,
    pub description: Option<String>,
    pub destination: Option<Destination>,
}

#[derive(Debug, Clone)]
pub struct NewBranching {
    pub title: String,
    pub description: Option<String>,
    pub destination: Destination,
}

#[derive(Debug, Clone)]
pub struct BranchingUpdate {
    pub title: String,
    pub description: Option<String>,
    pub destination: Destination,
}

#[derive(Debug, Clone)]
pub struct NewCondition {
    pub question_id: QuestionId,
    pub answer_ids: Vec<AnswerId>,
}

#[derive(Debug, Clone)]
pub struct ConditionUpdate {
    pub question_id: QuestionId,
    pub answer_ids: Vec<AnswerId>,
}

// ============== Service ==============

/// CRUD service over the five entities.
pub struct QuestionnaireService<S> {
    store: Arc<S>,
}

impl<S> Clone for QuestionnaireService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

fn require_text(field: &'static str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Relabel the store's generic NoRows as a NotFound for a specific entity.
fn no_rows_as(label: &'static str) -> impl Fn(StoreError) -> ServiceError {
    move |e| match e {
        StoreError::NoRows => ServiceError::NotFound(label),
        other => other.into(),
    }
}

impl<S: QuestionnaireStore> QuestionnaireService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    // ============== Questionnaires ==============

    pub async fn create_questionnaire(
        &self,
        input: NewQuestionnaire,
    ) -> ServiceResult<Questionnaire> {
        require_text("title", &input.title)?;
        let questionnaire = Questionnaire::new(input.title, input.description);
        self.store.insert_questionnaire(&questionnaire).await?;
        tracing::info!(
            formway.questionnaire = %questionnaire.id,
            "Created questionnaire"
        );
        Ok(questionnaire)
    }

    pub async fn get_questionnaire(
        &self,
        id: QuestionnaireId,
    ) -> ServiceResult<Questionnaire> {
        self.store
            .fetch_questionnaire(id)
            .await?
            .ok_or(ServiceError::NotFound("questionnaire"))
    }

    pub async fn list_questionnaires(
        &self,
        status: Option<QuestionnaireStatus>,
    ) -> ServiceResult<Vec<Questionnaire>> {
        Ok(self.store.list_questionnaires(status).await?)
    }

    pub async fn update_questionnaire(
        &self,
        id: QuestionnaireId,
        input: QuestionnaireUpdate,
    ) -> ServiceResult<Questionnaire> {
        require_text("title", &input.title)?;
        let mut questionnaire = self.get_questionnaire(id).await?;
        questionnaire.title = input.title;
        questionnaire.description = input.description;
        questionnaire.updated_at = Utc::now();
        self.store
            .update_questionnaire(&questionnaire)
            .await
            .map_err(no_rows_as("questionnaire"))?;
        Ok(questionnaire)
    }

    /// Run the lifecycle state machine. Illegal steps are conflicts, not
    /// validation errors: the request is well-formed, the state disagrees.
    pub async fn transition_status(
        &self,
        id: QuestionnaireId,
        next: QuestionnaireStatus,
    ) -> ServiceResult<Questionnaire> {
        let mut questionnaire = self.get_questionnaire(id).await?;
        if !questionnaire.status.can_transition(next) {
            return Err(ServiceError::Conflict(format!(
                "cannot move questionnaire from {} to {}",
                questionnaire.status.as_str(),
                next.as_str()
            )));
        }
        questionnaire.status = next;
        questionnaire.updated_at = Utc::now();
        self.store
            .update_questionnaire(&questionnaire)
            .await
            .map_err(no_rows_as("questionnaire"))?;
        tracing::info!(
            formway.questionnaire = %id,
            formway.status = next.as_str(),
            "Questionnaire status changed"
        );
        Ok(questionnaire)
    }

    /// Soft delete: a status transition, never a physical delete.
    pub async fn delete_questionnaire(&self, id: QuestionnaireId) -> ServiceResult<()> {
        self.transition_status(id, QuestionnaireStatus::Deleted)
            .await?;
        Ok(())
    }

    // ============== Questions ==============

    pub async fn create_question(
        &self,
        questionnaire_id: QuestionnaireId,
        input: NewQuestion,
    ) -> ServiceResult<Question> {
        require_text("content", &input.content)?;
        self.get_questionnaire(questionnaire_id).await?;

        let siblings = self.store.list_questions(questionnaire_id).await?;
        let order = match input.order {
            Some(order) => {
                if order < 1 {
                    return Err(ServiceError::Validation(
                        "order must be 1 or greater".into(),
                    ));
                }
                if siblings.iter().any(|q| q.order == order) {
                    return Err(ServiceError::Conflict(format!(
                        "position {order} is already taken"
                    )));
                }
                order
            }
            None => siblings.iter().map(|q| q.order).max().unwrap_or(0) + 1,
        };

        let question = Question {
            id: Uuid::new_v4(),
            questionnaire_id,
            order,
            content: input.content,
            description: input.description,
            kind: input.kind,
        };
        self.store.insert_question(&question).await?;
        Ok(question)
    }

    pub async fn get_question(&self, id: QuestionId) -> ServiceResult<Question> {
        self.store
            .fetch_question(id)
            .await?
            .ok_or(ServiceError::NotFound("question"))
    }

    pub async fn list_questions(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> ServiceResult<Vec<Question>> {
        self.get_questionnaire(questionnaire_id).await?;
        Ok(self.store.list_questions(questionnaire_id).await?)
    }

    pub async fn update_question(
        &self,
        id: QuestionId,
        input: QuestionUpdate,
    ) -> ServiceResult<Question> {
        require_text("content", &input.content)?;
        let mut question = self.get_question(id).await?;

        if input.order != question.order {
            if input.order < 1 {
                return Err(ServiceError::Validation(
                    "order must be 1 or greater".into(),
                ));
            }
            let siblings = self.store.list_questions(question.questionnaire_id).await?;
            if siblings.iter().any(|q| q.id != id && q.order == input.order) {
                return Err(ServiceError::Conflict(format!(
                    "position {} is already taken",
                    input.order
                )));
            }
        }

        question.order = input.order;
        question.content = input.content;
        question.description = input.description;
        question.kind = input.kind;
        self.store
            .update_question(&question)
            .await
            .map_err(no_rows_as("question"))?;
        Ok(question)
    }

    pub async fn delete_question(&self, id: QuestionId) -> ServiceResult<()> {
        self.store
            .delete_question(id)
            .await
            .map_err(no_rows_as("question"))
    }

    /// Rewrite positions to 1..n in the given sequence. The id set must be
    /// exactly the questionnaire's question set.
    pub async fn reorder_questions(
        &self,
        questionnaire_id: QuestionnaireId,
        ordered: Vec<QuestionId>,
    ) -> ServiceResult<Vec<Question>> {
        let existing = self.list_questions(questionnaire_id).await?;
        let existing_ids: HashSet<QuestionId> = existing.iter().map(|q| q.id).collect();
        let given: HashSet<QuestionId> = ordered.iter().copied().collect();
        if given.len() != ordered.len() {
            return Err(ServiceError::Validation(
                "question order contains duplicate ids".into(),
            ));
        }
        if given != existing_ids {
            return Err(ServiceError::Validation(
                "question order must list every question of the questionnaire exactly once"
                    .into(),
            ));
        }
        self.store
            .reorder_questions(questionnaire_id, &ordered)
            .await?;
        Ok(self.store.list_questions(questionnaire_id).await?)
    }

    // ============== Answers ==============

    pub async fn create_answer(
        &self,
        question_id: QuestionId,
        input: NewAnswer,
    ) -> ServiceResult<Answer> {
        require_text("content", &input.content)?;
        let question = self.get_question(question_id).await?;
        if let Some(destination) = &input.destination {
            self.validate_destination(question.questionnaire_id, destination)
                .await?;
        }

        let answer = Answer {
            id: Uuid::new_v4(),
            question_id,
            content: input.content,
            description: input.description,
            destination: input.destination,
        };
        self.store.insert_answer(&answer).await?;
        Ok(answer)
    }

    pub async fn get_answer(&self, id: AnswerId) -> ServiceResult<Answer> {
        self.store
            .fetch_answer(id)
            .await?
            .ok_or(ServiceError::NotFound("answer"))
    }

    pub async fn list_answers(&self, question_id: QuestionId) -> ServiceResult<Vec<Answer>> {
        self.get_question(question_id).await?;
        Ok(self.store.list_answers(question_id).await?)
    }

    pub async fn update_answer(
        &self,
        id: AnswerId,
        input: AnswerUpdate,
    ) -> ServiceResult<Answer> {
        require_text("content", &input.content)?;
        let mut answer = self.get_answer(id).await?;
        if let Some(destination) = &input.destination {
            let question = self.get_question(answer.question_id).await?;
            self.validate_destination(question.questionnaire_id, destination)
                .await?;
        }
        answer.content = input.content;
        answer.description = input.description;
        answer.destination = input.destination;
        self.store
            .update_answer(&answer)
            .await
            .map_err(no_rows_as("answer"))?;
        Ok(answer)
    }

    pub async fn delete_answer(&self, id: AnswerId) -> ServiceResult<()> {
        self.store
            .delete_answer(id)
            .await
            .map_err(no_rows_as("answer"))
    }

    // ============== Branchings ==============

    pub async fn create_branching(
        &self,
        questionnaire_id: QuestionnaireId,
        input: NewBranching,
    ) -> ServiceResult<Branching> {
        require_text("title", &input.title)?;
        self.get_questionnaire(questionnaire_id).await?;
        self.validate_destination(questionnaire_id, &input.destination)
            .await?;

        let branching = Branching {
            id: Uuid::new_v4(),
            questionnaire_id,
            title: input.title,
            description: input.description,
            destination: input.destination,
            created_at: Utc::now(),
        };
        self.store.insert_branching(&branching).await?;
        Ok(branching)
    }

    pub async fn get_branching(
        &self,
        id: BranchingId,
    ) -> ServiceResult<(Branching, Vec<Condition>)> {
        let branching = self
            .store
            .fetch_branching(id)
            .await?
            .ok_or(ServiceError::NotFound("branching"))?;
        let conditions = self.store.list_conditions(id).await?;
        Ok((branching, conditions))
    }

    pub async fn list_branchings(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> ServiceResult<Vec<(Branching, Vec<Condition>)>> {
        self.get_questionnaire(questionnaire_id).await?;
        let rules = self.store.list_branchings(questionnaire_id).await?;
        let mut detailed = Vec::with_capacity(rules.len());
        for branching in rules {
            let conditions = self.store.list_conditions(branching.id).await?;
            detailed.push((branching, conditions));
        }
        Ok(detailed)
    }

    pub async fn update_branching(
        &self,
        id: BranchingId,
        input: BranchingUpdate,
    ) -> ServiceResult<Branching> {
        require_text("title", &input.title)?;
        let (mut branching, _) = self.get_branching(id).await?;
        self.validate_destination(branching.questionnaire_id, &input.destination)
            .await?;
        branching.title = input.title;
        branching.description = input.description;
        branching.destination = input.destination;
        self.store
            .update_branching(&branching)
            .await
            .map_err(no_rows_as("branching"))?;
        Ok(branching)
    }

    pub async fn delete_branching(&self, id: BranchingId) -> ServiceResult<()> {
        self.store
            .delete_branching(id)
            .await
            .map_err(no_rows_as("branching"))
    }

    // ============== Conditions ==============

    pub async fn create_condition(
        &self,
        branching_id: BranchingId,
        input: NewCondition,
    ) -> ServiceResult<Condition> {
        let (branching, _) = self.get_branching(branching_id).await?;
        self.validate_condition_refs(&branching, input.question_id, &input.answer_ids)
            .await?;

        let condition = Condition {
            id: Uuid::new_v4(),
            branching_id,
            question_id: input.question_id,
            answer_ids: input.answer_ids,
        };
        self.store.insert_condition(&condition).await?;
        Ok(condition)
    }

    pub async fn get_condition(&self, id: ConditionId) -> ServiceResult<Condition> {
        self.store
            .fetch_condition(id)
            .await?
            .ok_or(ServiceError::NotFound("condition"))
    }

    pub async fn update_condition(
        &self,
        id: ConditionId,
        input: ConditionUpdate,
    ) -> ServiceResult<Condition> {
        let mut condition = self.get_condition(id).await?;
        let (branching, _) = self.get_branching(condition.branching_id).await?;
        self.validate_condition_refs(&branching, input.question_id, &input.answer_ids)
            .await?;
        condition.question_id = input.question_id;
        condition.answer_ids = input.answer_ids;
        self.store
            .update_condition(&condition)
            .await
            .map_err(no_rows_as("condition"))?;
        Ok(condition)
    }

    pub async fn delete_condition(&self, id: ConditionId) -> ServiceResult<()> {
        self.store
            .delete_condition(id)
            .await
            .map_err(no_rows_as("condition"))
    }

    // ============== Ownership checks ==============

    /// A destination must stay inside the questionnaire it is reached from.
    async fn validate_destination(
        &self,
        questionnaire_id: QuestionnaireId,
        destination: &Destination,
    ) -> ServiceResult<()> {
        match destination {
            Destination::Question { question_id } => {
                let target = self.get_question(*question_id).await?;
                if target.questionnaire_id != questionnaire_id {
                    return Err(ServiceError::Conflict(format!(
                        "destination question {question_id} belongs to another questionnaire"
                    )));
                }
                Ok(())
            }
            Destination::External { url } => {
                require_text("destination url", url)?;
                Ok(())
            }
        }
    }

    /// A condition must reference a question of the branching's own
    /// questionnaire, and only answers of that question.
    async fn validate_condition_refs(
        &self,
        branching: &Branching,
        question_id: QuestionId,
        answer_ids: &[AnswerId],
    ) -> ServiceResult<()> {
        if answer_ids.is_empty() {
            return Err(ServiceError::Validation(
                "condition answer set must not be empty".into(),
            ));
        }
        let question = self.get_question(question_id).await?;
        if question.questionnaire_id != branching.questionnaire_id {
            return Err(ServiceError::Conflict(format!(
                "question {question_id} belongs to another questionnaire"
            )));
        }
        let valid: HashSet<AnswerId> = self
            .store
            .list_answers(question_id)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();
        for answer_id in answer_ids {
            if !valid.contains(answer_id) {
                return Err(ServiceError::Validation(format!(
                    "answer {answer_id} does not belong to question {question_id}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formway_store::MemoryStore;

    fn service() -> QuestionnaireService<MemoryStore> {
        QuestionnaireService::new(Arc::new(MemoryStore::new()))
    }

    async fn questionnaire(svc: &QuestionnaireService<MemoryStore>) -> Questionnaire {
        svc.create_questionnaire(NewQuestionnaire {
            title: "Broadband access".into(),
            description: Some("Eligibility check".into()),
        })
        .await
        .unwrap()
    }

    fn new_question(order: Option<i32>) -> NewQuestion {
        NewQuestion {
            order,
            content: "Do you have a connection at home?".into(),
            description: None,
            kind: QuestionKind::SingleChoice,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let svc = service();
        let err = svc
            .create_questionnaire(NewQuestionnaire {
                title: "   ".into(),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_status_machine_is_enforced() {
        let svc = service();
        let qn = questionnaire(&svc).await;
        assert_eq!(qn.status, QuestionnaireStatus::Draft);

        // Draft cannot archive directly.
        let err = svc
            .transition_status(qn.id, QuestionnaireStatus::Archived)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let published = svc
            .transition_status(qn.id, QuestionnaireStatus::Published)
            .await
            .unwrap();
        assert_eq!(published.status, QuestionnaireStatus::Published);

        svc.delete_questionnaire(qn.id).await.unwrap();
        let deleted = svc.get_questionnaire(qn.id).await.unwrap();
        assert_eq!(deleted.status, QuestionnaireStatus::Deleted);

        // Deleted is terminal.
        let err = svc
            .transition_status(qn.id, QuestionnaireStatus::Published)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_default_list() {
        let svc = service();
        let qn = questionnaire(&svc).await;
        svc.delete_questionnaire(qn.id).await.unwrap();

        assert!(svc.list_questionnaires(None).await.unwrap().is_empty());
        // Still fetchable by id: soft delete, not physical.
        assert!(svc.get_questionnaire(qn.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_question_order_is_assigned_and_collision_checked() {
        let svc = service();
        let qn = questionnaire(&svc).await;

        let q1 = svc.create_question(qn.id, new_question(None)).await.unwrap();
        assert_eq!(q1.order, 1);
        let q2 = svc.create_question(qn.id, new_question(None)).await.unwrap();
        assert_eq!(q2.order, 2);

        let err = svc
            .create_question(qn.id, new_question(Some(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = svc
            .create_question(qn.id, new_question(Some(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_question_create_under_unknown_questionnaire_is_not_found() {
        let svc = service();
        let err = svc
            .create_question(Uuid::new_v4(), new_question(None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("questionnaire")));
    }

    #[tokio::test]
    async fn test_answer_destination_must_stay_in_questionnaire() {
        let svc = service();
        let qn_a = questionnaire(&svc).await;
        let qn_b = questionnaire(&svc).await;
        let q_a = svc.create_question(qn_a.id, new_question(None)).await.unwrap();
        let q_b = svc.create_question(qn_b.id, new_question(None)).await.unwrap();

        let err = svc
            .create_answer(
                q_a.id,
                NewAnswer {
                    content: "Jump elsewhere".into(),
                    description: None,
                    destination: Some(Destination::Question {
                        question_id: q_b.id,
                    }),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // Same questionnaire is fine.
        let q_a2 = svc.create_question(qn_a.id, new_question(None)).await.unwrap();
        let answer = svc
            .create_answer(
                q_a.id,
                NewAnswer {
                    content: "Jump ahead".into(),
                    description: None,
                    destination: Some(Destination::Question {
                        question_id: q_a2.id,
                    }),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            answer.destination,
            Some(Destination::Question {
                question_id: q_a2.id
            })
        );
    }

    #[tokio::test]
    async fn test_condition_must_reference_owning_questionnaire() {
        let svc = service();
        let qn_a = questionnaire(&svc).await;
        let qn_b = questionnaire(&svc).await;
        let q_a = svc.create_question(qn_a.id, new_question(None)).await.unwrap();
        let q_b = svc.create_question(qn_b.id, new_question(None)).await.unwrap();
        let answer_b = svc
            .create_answer(
                q_b.id,
                NewAnswer {
                    content: "Yes".into(),
                    description: None,
                    destination: None,
                },
            )
            .await
            .unwrap();

        let rule = svc
            .create_branching(
                qn_a.id,
                NewBranching {
                    title: "Cross check".into(),
                    description: None,
                    destination: Destination::Question { question_id: q_a.id },
                },
            )
            .await
            .unwrap();

        // q_b belongs to qn_b: ownership invariant violation.
        let err = svc
            .create_condition(
                rule.id,
                NewCondition {
                    question_id: q_b.id,
                    answer_ids: vec![answer_b.id],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_condition_answers_must_belong_to_its_question() {
        let svc = service();
        let qn = questionnaire(&svc).await;
        let q1 = svc.create_question(qn.id, new_question(None)).await.unwrap();
        let q2 = svc.create_question(qn.id, new_question(None)).await.unwrap();
        let a2 = svc
            .create_answer(
                q2.id,
                NewAnswer {
                    content: "Elsewhere".into(),
                    description: None,
                    destination: None,
                },
            )
            .await
            .unwrap();

        let rule = svc
            .create_branching(
                qn.id,
                NewBranching {
                    title: "Rule".into(),
                    description: None,
                    destination: Destination::Question { question_id: q2.id },
                },
            )
            .await
            .unwrap();

        let err = svc
            .create_condition(
                rule.id,
                NewCondition {
                    question_id: q1.id,
                    answer_ids: vec![a2.id],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = svc
            .create_condition(
                rule.id,
                NewCondition {
                    question_id: q1.id,
                    answer_ids: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_branching_destination_must_stay_in_questionnaire() {
        let svc = service();
        let qn_a = questionnaire(&svc).await;
        let qn_b = questionnaire(&svc).await;
        let q_b = svc.create_question(qn_b.id, new_question(None)).await.unwrap();

        let err = svc
            .create_branching(
                qn_a.id,
                NewBranching {
                    title: "Bad target".into(),
                    description: None,
                    destination: Destination::Question { question_id: q_b.id },
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reorder_requires_exact_id_set() {
        let svc = service();
        let qn = questionnaire(&svc).await;
        let q1 = svc.create_question(qn.id, new_question(None)).await.unwrap();
        let q2 = svc.create_question(qn.id, new_question(None)).await.unwrap();

        let err = svc
            .reorder_questions(qn.id, vec![q1.id])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = svc
            .reorder_questions(qn.id, vec![q1.id, q1.id])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let reordered = svc
            .reorder_questions(qn.id, vec![q2.id, q1.id])
            .await
            .unwrap();
        assert_eq!(reordered[0].id, q2.id);
        assert_eq!(reordered[0].order, 1);
    }

    #[tokio::test]
    async fn test_branching_delete_removes_conditions() {
        let svc = service();
        let qn = questionnaire(&svc).await;
        let q1 = svc.create_question(qn.id, new_question(None)).await.unwrap();
        let a1 = svc
            .create_answer(
                q1.id,
                NewAnswer {
                    content: "Yes".into(),
                    description: None,
                    destination: None,
                },
            )
            .await
            .unwrap();

        let rule = svc
            .create_branching(
                qn.id,
                NewBranching {
                    title: "Rule".into(),
                    description: None,
                    destination: Destination::External {
                        url: "https://example.org".into(),
                    },
                },
            )
            .await
            .unwrap();
        let condition = svc
            .create_condition(
                rule.id,
                NewCondition {
                    question_id: q1.id,
                    answer_ids: vec![a1.id],
                },
            )
            .await
            .unwrap();

        svc.delete_branching(rule.id).await.unwrap();
        let err = svc.get_condition(condition.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("condition")));
    }
}
