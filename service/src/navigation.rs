//! Navigation orchestration: load the snapshot, delegate to the core
//! resolver.
//!
//! The resolver itself is pure; this service supplies its rows and turns
//! its errors into the tagged service result.

use std::sync::Arc;

use formway_core::navigation::{NextState, NextStateRequest};
use formway_core::model::QuestionnaireId;
use formway_store::QuestionnaireStore;

use crate::result::{ServiceError, ServiceResult};

/// Resolves the next state of a questionnaire traversal.
pub struct NavigationService<S> {
    store: Arc<S>,
}

impl<S> Clone for NavigationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: QuestionnaireStore> NavigationService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// One resolution step. Unknown questions are NotFound; every malformed
    /// selection is a Validation error detected before or inside the pure
    /// resolver. No side effects: selected-answer persistence is the
    /// caller's concern.
    pub async fn resolve(
        &self,
        questionnaire_id: QuestionnaireId,
        request: NextStateRequest,
    ) -> ServiceResult<NextState> {
        request.validate()?;

        let snapshot = self
            .store
            .load_navigation(questionnaire_id, request.current_question_id)
            .await?
            .ok_or(ServiceError::NotFound("question"))?;

        let next = snapshot.resolve(&request)?;
        tracing::info!(
            formway.resolve.questionnaire = %questionnaire_id,
            formway.resolve.question = %request.current_question_id,
            formway.resolve.next = ?next,
            "Resolved next state"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaires::{
        NewAnswer, NewBranching, NewCondition, NewQuestion, NewQuestionnaire,
        QuestionnaireService,
    };
    use crate::result::ServiceError;
    use formway_core::model::{Destination, QuestionKind, Questionnaire};
    use formway_core::navigation::NextState;
    use formway_store::MemoryStore;
    use uuid::Uuid;

    fn services() -> (QuestionnaireService<MemoryStore>, NavigationService<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            QuestionnaireService::new(store.clone()),
            NavigationService::new(store),
        )
    }

    async fn questionnaire(crud: &QuestionnaireService<MemoryStore>) -> Questionnaire {
        crud.create_questionnaire(NewQuestionnaire {
            title: "Laptop eligibility".into(),
            description: None,
        })
        .await
        .unwrap()
    }

    fn new_question(order: i32) -> NewQuestion {
        NewQuestion {
            order: Some(order),
            content: format!("Question {order}"),
            description: None,
            kind: QuestionKind::SingleChoice,
        }
    }

    fn new_answer(content: &str) -> NewAnswer {
        NewAnswer {
            content: content.into(),
            description: None,
            destination: None,
        }
    }

    fn request(question_id: Uuid, order: i32, selected: Vec<Uuid>) -> NextStateRequest {
        NextStateRequest {
            current_question_id: question_id,
            current_question_order: order,
            selected_answer_ids: selected,
        }
    }

    /// The full round trip: author a questionnaire with a branching rule
    /// through CRUD, then resolve with the condition's answer set and land
    /// on the configured destination.
    #[tokio::test]
    async fn test_crud_then_resolve_round_trip() {
        let (crud, nav) = services();
        let qn = questionnaire(&crud).await;

        let q1 = crud.create_question(qn.id, new_question(1)).await.unwrap();
        let q2 = crud.create_question(qn.id, new_question(2)).await.unwrap();
        let q3 = crud.create_question(qn.id, new_question(3)).await.unwrap();

        let yes = crud.create_answer(q1.id, new_answer("Yes")).await.unwrap();
        let no = crud.create_answer(q1.id, new_answer("No")).await.unwrap();

        let rule = crud
            .create_branching(
                qn.id,
                NewBranching {
                    title: "Skip ahead on No".into(),
                    description: None,
                    destination: Destination::Question { question_id: q3.id },
                },
            )
            .await
            .unwrap();
        crud.create_condition(
            rule.id,
            NewCondition {
                question_id: q1.id,
                answer_ids: vec![no.id],
            },
        )
        .await
        .unwrap();

        // The condition's answer set: branching destination wins.
        let next = nav
            .resolve(qn.id, request(q1.id, 1, vec![no.id]))
            .await
            .unwrap();
        assert_eq!(
            next,
            NextState::Question {
                next_question_id: q3.id
            }
        );

        // Any other valid selection: default next-order pointer.
        let next = nav
            .resolve(qn.id, request(q1.id, 1, vec![yes.id]))
            .await
            .unwrap();
        assert_eq!(
            next,
            NextState::Question {
                next_question_id: q2.id
            }
        );
    }

    /// Questions ordered 1,2,3 and no branching rules: each step walks the
    /// order, and the last question terminates.
    #[tokio::test]
    async fn test_plain_walk_ends_terminal() {
        let (crud, nav) = services();
        let qn = questionnaire(&crud).await;

        let q1 = crud.create_question(qn.id, new_question(1)).await.unwrap();
        let q2 = crud.create_question(qn.id, new_question(2)).await.unwrap();
        let q3 = crud.create_question(qn.id, new_question(3)).await.unwrap();
        let a1 = crud.create_answer(q1.id, new_answer("Next")).await.unwrap();
        let a2 = crud.create_answer(q2.id, new_answer("Next")).await.unwrap();
        let a3 = crud.create_answer(q3.id, new_answer("Done")).await.unwrap();

        let next = nav
            .resolve(qn.id, request(q1.id, 1, vec![a1.id]))
            .await
            .unwrap();
        assert_eq!(
            next,
            NextState::Question {
                next_question_id: q2.id
            }
        );

        let next = nav
            .resolve(qn.id, request(q2.id, 2, vec![a2.id]))
            .await
            .unwrap();
        assert_eq!(
            next,
            NextState::Question {
                next_question_id: q3.id
            }
        );

        let next = nav
            .resolve(qn.id, request(q3.id, 3, vec![a3.id]))
            .await
            .unwrap();
        assert_eq!(next, NextState::Terminal);
    }

    #[tokio::test]
    async fn test_empty_selection_is_validation() {
        let (crud, nav) = services();
        let qn = questionnaire(&crud).await;
        let q1 = crud.create_question(qn.id, new_question(1)).await.unwrap();

        let err = nav
            .resolve(qn.id, request(q1.id, 1, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_foreign_answer_is_validation() {
        let (crud, nav) = services();
        let qn = questionnaire(&crud).await;
        let q1 = crud.create_question(qn.id, new_question(1)).await.unwrap();
        let q2 = crud.create_question(qn.id, new_question(2)).await.unwrap();
        crud.create_answer(q1.id, new_answer("Mine")).await.unwrap();
        let other = crud.create_answer(q2.id, new_answer("Other")).await.unwrap();

        let err = nav
            .resolve(qn.id, request(q1.id, 1, vec![other.id]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_question_is_not_found() {
        let (crud, nav) = services();
        let qn = questionnaire(&crud).await;

        let err = nav
            .resolve(qn.id, request(Uuid::new_v4(), 1, vec![Uuid::new_v4()]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("question")));
    }

    #[tokio::test]
    async fn test_external_redirect_destination() {
        let (crud, nav) = services();
        let qn = questionnaire(&crud).await;
        let q1 = crud.create_question(qn.id, new_question(1)).await.unwrap();
        let a1 = crud.create_answer(q1.id, new_answer("Out")).await.unwrap();

        let rule = crud
            .create_branching(
                qn.id,
                NewBranching {
                    title: "Hand off".into(),
                    description: None,
                    destination: Destination::External {
                        url: "https://example.org/apply".into(),
                    },
                },
            )
            .await
            .unwrap();
        crud.create_condition(
            rule.id,
            NewCondition {
                question_id: q1.id,
                answer_ids: vec![a1.id],
            },
        )
        .await
        .unwrap();

        let next = nav
            .resolve(qn.id, request(q1.id, 1, vec![a1.id]))
            .await
            .unwrap();
        assert_eq!(
            next,
            NextState::Redirect {
                destination_url: "https://example.org/apply".into()
            }
        );
    }
}
