//! In-memory implementation of the `QuestionnaireStore`.
//!
//! Arena-style maps keyed by id with parent-id back-references, used by the
//! service test-suite and the `--memory` backend of the server binary.
//! Declaration order is tracked with a monotonic insertion sequence, which
//! plays the role of the `created_at, id` sort in the SQL backend.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use formway_core::model::{
    Answer, AnswerId, Branching, BranchingId, Condition, ConditionId, Question, QuestionId,
    Questionnaire, QuestionnaireId, QuestionnaireStatus,
};
use formway_core::navigation::NavigationSnapshot;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::store::QuestionnaireStore;

#[derive(Default)]
struct Inner {
    questionnaires: HashMap<QuestionnaireId, Questionnaire>,
    questions: HashMap<QuestionId, Question>,
    answers: HashMap<AnswerId, Answer>,
    branchings: HashMap<BranchingId, Branching>,
    conditions: HashMap<ConditionId, Condition>,
    /// Insertion sequence per row id; lists sort by it.
    seq: HashMap<Uuid, u64>,
    next_seq: u64,
}

impl Inner {
    fn stamp(&mut self, id: Uuid) {
        self.next_seq += 1;
        self.seq.insert(id, self.next_seq);
    }

    fn seq_of(&self, id: Uuid) -> u64 {
        self.seq.get(&id).copied().unwrap_or(u64::MAX)
    }
}

/// In-memory questionnaire store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert_unique<T>(map: &mut HashMap<Uuid, T>, id: Uuid, row: T) -> StoreResult<()> {
    if map.contains_key(&id) {
        return Err(StoreError::UniqueViolation(format!(
            "duplicate primary key {id}"
        )));
    }
    map.insert(id, row);
    Ok(())
}

#[async_trait]
impl QuestionnaireStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_questionnaire(&self, questionnaire: &Questionnaire) -> StoreResult<()> {
        let mut inner = self.inner.write();
        insert_unique(
            &mut inner.questionnaires,
            questionnaire.id,
            questionnaire.clone(),
        )?;
        inner.stamp(questionnaire.id);
        Ok(())
    }

    async fn fetch_questionnaire(
        &self,
        id: QuestionnaireId,
    ) -> StoreResult<Option<Questionnaire>> {
        Ok(self.inner.read().questionnaires.get(&id).cloned())
    }

    async fn list_questionnaires(
        &self,
        status: Option<QuestionnaireStatus>,
    ) -> StoreResult<Vec<Questionnaire>> {
        let inner = self.inner.read();
        let mut rows: Vec<Questionnaire> = inner
            .questionnaires
            .values()
            .filter(|q| match status {
                Some(status) => q.status == status,
                None => q.status != QuestionnaireStatus::Deleted,
            })
            .cloned()
            .collect();
        // Newest first, like the SQL backend.
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn update_questionnaire(&self, questionnaire: &Questionnaire) -> StoreResult<()> {
        let mut inner = self.inner.write();
        match inner.questionnaires.get_mut(&questionnaire.id) {
            Some(row) => {
                *row = questionnaire.clone();
                Ok(())
            }
            None => Err(StoreError::NoRows),
        }
    }

    async fn insert_question(&self, question: &Question) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if !inner.questionnaires.contains_key(&question.questionnaire_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "questionnaire {} does not exist",
                question.questionnaire_id
            )));
        }
        insert_unique(&mut inner.questions, question.id, question.clone())?;
        inner.stamp(question.id);
        Ok(())
    }

    async fn fetch_question(&self, id: QuestionId) -> StoreResult<Option<Question>> {
        Ok(self.inner.read().questions.get(&id).cloned())
    }

    async fn list_questions(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> StoreResult<Vec<Question>> {
        let inner = self.inner.read();
        let mut rows: Vec<Question> = inner
            .questions
            .values()
            .filter(|q| q.questionnaire_id == questionnaire_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn update_question(&self, question: &Question) -> StoreResult<()> {
        let mut inner = self.inner.write();
        match inner.questions.get_mut(&question.id) {
            Some(row) => {
                *row = question.clone();
                Ok(())
            }
            None => Err(StoreError::NoRows),
        }
    }

    async fn delete_question(&self, id: QuestionId) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.questions.remove(&id).is_none() {
            return Err(StoreError::NoRows);
        }
        // Mirror the schema: answers and conditions cascade, answer
        // destinations pointing at the question are cleared.
        inner.answers.retain(|_, a| a.question_id != id);
        inner.conditions.retain(|_, c| c.question_id != id);
        for answer in inner.answers.values_mut() {
            if matches!(
                answer.destination,
                Some(formway_core::model::Destination::Question { question_id }) if question_id == id
            ) {
                answer.destination = None;
            }
        }
        Ok(())
    }

    async fn reorder_questions(
        &self,
        questionnaire_id: QuestionnaireId,
        ordered: &[QuestionId],
    ) -> StoreResult<()> {
        let mut inner = self.inner.write();
        for question_id in ordered {
            match inner.questions.get(question_id) {
                Some(q) if q.questionnaire_id == questionnaire_id => {}
                _ => return Err(StoreError::NoRows),
            }
        }
        for (index, question_id) in ordered.iter().enumerate() {
            if let Some(q) = inner.questions.get_mut(question_id) {
                q.order = index as i32 + 1;
            }
        }
        Ok(())
    }

    async fn insert_answer(&self, answer: &Answer) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if !inner.questions.contains_key(&answer.question_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "question {} does not exist",
                answer.question_id
            )));
        }
        insert_unique(&mut inner.answers, answer.id, answer.clone())?;
        inner.stamp(answer.id);
        Ok(())
    }

    async fn fetch_answer(&self, id: AnswerId) -> StoreResult<Option<Answer>> {
        Ok(self.inner.read().answers.get(&id).cloned())
    }

    async fn list_answers(&self, question_id: QuestionId) -> StoreResult<Vec<Answer>> {
        let inner = self.inner.read();
        let mut rows: Vec<Answer> = inner
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| inner.seq_of(a.id));
        Ok(rows)
    }

    async fn update_answer(&self, answer: &Answer) -> StoreResult<()> {
        let mut inner = self.inner.write();
        match inner.answers.get_mut(&answer.id) {
            Some(row) => {
                *row = answer.clone();
                Ok(())
            }
            None => Err(StoreError::NoRows),
        }
    }

    async fn delete_answer(&self, id: AnswerId) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.answers.remove(&id).is_none() {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn insert_branching(&self, branching: &Branching) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if !inner
            .questionnaires
            .contains_key(&branching.questionnaire_id)
        {
            return Err(StoreError::ConstraintViolation(format!(
                "questionnaire {} does not exist",
                branching.questionnaire_id
            )));
        }
        insert_unique(&mut inner.branchings, branching.id, branching.clone())?;
        inner.stamp(branching.id);
        Ok(())
    }

    async fn fetch_branching(&self, id: BranchingId) -> StoreResult<Option<Branching>> {
        Ok(self.inner.read().branchings.get(&id).cloned())
    }

    async fn list_branchings(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> StoreResult<Vec<Branching>> {
        let inner = self.inner.read();
        let mut rows: Vec<Branching> = inner
            .branchings
            .values()
            .filter(|b| b.questionnaire_id == questionnaire_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(inner.seq_of(a.id).cmp(&inner.seq_of(b.id)))
        });
        Ok(rows)
    }

    async fn update_branching(&self, branching: &Branching) -> StoreResult<()> {
        let mut inner = self.inner.write();
        match inner.branchings.get_mut(&branching.id) {
            Some(row) => {
                *row = branching.clone();
                Ok(())
            }
            None => Err(StoreError::NoRows),
        }
    }

    async fn delete_branching(&self, id: BranchingId) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.branchings.remove(&id).is_none() {
            return Err(StoreError::NoRows);
        }
        inner.conditions.retain(|_, c| c.branching_id != id);
        Ok(())
    }

    async fn insert_condition(&self, condition: &Condition) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if !inner.branchings.contains_key(&condition.branching_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "branching {} does not exist",
                condition.branching_id
            )));
        }
        if !inner.questions.contains_key(&condition.question_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "question {} does not exist",
                condition.question_id
            )));
        }
        insert_unique(&mut inner.conditions, condition.id, condition.clone())?;
        inner.stamp(condition.id);
        Ok(())
    }

    async fn fetch_condition(&self, id: ConditionId) -> StoreResult<Option<Condition>> {
        Ok(self.inner.read().conditions.get(&id).cloned())
    }

    async fn list_conditions(&self, branching_id: BranchingId) -> StoreResult<Vec<Condition>> {
        let inner = self.inner.read();
        let mut rows: Vec<Condition> = inner
            .conditions
            .values()
            .filter(|c| c.branching_id == branching_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| inner.seq_of(c.id));
        Ok(rows)
    }

    async fn update_condition(&self, condition: &Condition) -> StoreResult<()> {
        let mut inner = self.inner.write();
        match inner.conditions.get_mut(&condition.id) {
            Some(row) => {
                *row = condition.clone();
                Ok(())
            }
            None => Err(StoreError::NoRows),
        }
    }

    async fn delete_condition(&self, id: ConditionId) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.conditions.remove(&id).is_none() {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn load_navigation(
        &self,
        questionnaire_id: QuestionnaireId,
        question_id: QuestionId,
    ) -> StoreResult<Option<NavigationSnapshot>> {
        let current = match self.fetch_question(question_id).await? {
            Some(q) if q.questionnaire_id == questionnaire_id => q,
            _ => return Ok(None),
        };

        let answers = self.list_answers(question_id).await?;
        let questions = self.list_questions(questionnaire_id).await?;
        let rules = self.list_branchings(questionnaire_id).await?;

        let mut branchings = Vec::with_capacity(rules.len());
        for branching in rules {
            let conditions = self.list_conditions(branching.id).await?;
            branchings.push((branching, conditions));
        }

        Ok(Some(NavigationSnapshot {
            current,
            answers,
            branchings,
            questions,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formway_core::model::QuestionKind;

    fn questionnaire() -> Questionnaire {
        Questionnaire::new("Device support", None)
    }

    fn question(questionnaire_id: QuestionnaireId, order: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            questionnaire_id,
            order,
            content: format!("Question {order}"),
            description: None,
            kind: QuestionKind::SingleChoice,
        }
    }

    #[tokio::test]
    async fn test_insert_fetch_round_trip() {
        let store = MemoryStore::new();
        let qn = questionnaire();
        store.insert_questionnaire(&qn).await.unwrap();

        let fetched = store.fetch_questionnaire(qn.id).await.unwrap().unwrap();
        assert_eq!(fetched, qn);
        assert!(store
            .fetch_questionnaire(Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_unique_violation() {
        let store = MemoryStore::new();
        let qn = questionnaire();
        store.insert_questionnaire(&qn).await.unwrap();
        let err = store.insert_questionnaire(&qn).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_orphan_question_is_constraint_violation() {
        let store = MemoryStore::new();
        let q = question(Uuid::new_v4(), 1);
        let err = store.insert_question(&q).await.unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_questions_list_in_position_order() {
        let store = MemoryStore::new();
        let qn = questionnaire();
        store.insert_questionnaire(&qn).await.unwrap();

        let q3 = question(qn.id, 3);
        let q1 = question(qn.id, 1);
        let q2 = question(qn.id, 2);
        for q in [&q3, &q1, &q2] {
            store.insert_question(q).await.unwrap();
        }

        let listed = store.list_questions(qn.id).await.unwrap();
        let orders: Vec<i32> = listed.iter().map(|q| q.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_deleted_questionnaires_are_hidden_from_default_list() {
        let store = MemoryStore::new();
        let mut qn = questionnaire();
        store.insert_questionnaire(&qn).await.unwrap();

        qn.status = QuestionnaireStatus::Deleted;
        store.update_questionnaire(&qn).await.unwrap();

        assert!(store.list_questionnaires(None).await.unwrap().is_empty());
        let deleted = store
            .list_questionnaires(Some(QuestionnaireStatus::Deleted))
            .await
            .unwrap();
        assert_eq!(deleted.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_branching_cascades_to_conditions() {
        let store = MemoryStore::new();
        let qn = questionnaire();
        store.insert_questionnaire(&qn).await.unwrap();
        let q1 = question(qn.id, 1);
        store.insert_question(&q1).await.unwrap();

        let branching = Branching {
            id: Uuid::new_v4(),
            questionnaire_id: qn.id,
            title: "Rule".into(),
            description: None,
            destination: formway_core::model::Destination::External {
                url: "https://example.org".into(),
            },
            created_at: chrono::Utc::now(),
        };
        store.insert_branching(&branching).await.unwrap();

        let condition = Condition {
            id: Uuid::new_v4(),
            branching_id: branching.id,
            question_id: q1.id,
            answer_ids: vec![Uuid::new_v4()],
        };
        store.insert_condition(&condition).await.unwrap();

        store.delete_branching(branching.id).await.unwrap();
        assert!(store.fetch_condition(condition.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_navigation_rejects_foreign_questionnaire() {
        let store = MemoryStore::new();
        let qn_a = questionnaire();
        let qn_b = questionnaire();
        store.insert_questionnaire(&qn_a).await.unwrap();
        store.insert_questionnaire(&qn_b).await.unwrap();
        let q = question(qn_a.id, 1);
        store.insert_question(&q).await.unwrap();

        assert!(store.load_navigation(qn_b.id, q.id).await.unwrap().is_none());
        assert!(store.load_navigation(qn_a.id, q.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reorder_questions() {
        let store = MemoryStore::new();
        let qn = questionnaire();
        store.insert_questionnaire(&qn).await.unwrap();
        let q1 = question(qn.id, 1);
        let q2 = question(qn.id, 2);
        store.insert_question(&q1).await.unwrap();
        store.insert_question(&q2).await.unwrap();

        store.reorder_questions(qn.id, &[q2.id, q1.id]).await.unwrap();

        let listed = store.list_questions(qn.id).await.unwrap();
        assert_eq!(listed[0].id, q2.id);
        assert_eq!(listed[0].order, 1);
        assert_eq!(listed[1].id, q1.id);
        assert_eq!(listed[1].order, 2);
    }
}
