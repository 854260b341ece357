//! PostgreSQL implementation of the `QuestionnaireStore`.
//!
//! Entities map through private row structs; the optional `Destination` is
//! flattened into a `destination_question_id` / `destination_url` column
//! pair (the schema guarantees at most one is set).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use formway_core::model::{
    Answer, AnswerId, Branching, BranchingId, Condition, ConditionId, Destination, Question,
    QuestionId, Questionnaire, QuestionnaireId, QuestionnaireStatus,
};
use formway_core::navigation::NavigationSnapshot;

use crate::error::{StoreError, StoreResult};
use crate::pool::PostgresPool;
use crate::store::QuestionnaireStore;

/// PostgreSQL-backed questionnaire store.
#[derive(Clone)]
pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.inner().clone(),
        }
    }

    /// Build directly from a raw sqlx pool.
    pub fn from_pool(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::RowNotFound => StoreError::NoRows,
        sqlx::Error::Database(db) => match db.kind() {
            sqlx::error::ErrorKind::UniqueViolation => {
                StoreError::UniqueViolation(db.to_string())
            }
            sqlx::error::ErrorKind::ForeignKeyViolation
            | sqlx::error::ErrorKind::NotNullViolation
            | sqlx::error::ErrorKind::CheckViolation => {
                StoreError::ConstraintViolation(db.to_string())
            }
            _ => StoreError::QueryFailed(db.to_string()),
        },
        other => StoreError::QueryFailed(other.to_string()),
    }
}

fn destination_columns(destination: Option<&Destination>) -> (Option<Uuid>, Option<String>) {
    match destination {
        Some(Destination::Question { question_id }) => (Some(*question_id), None),
        Some(Destination::External { url }) => (None, Some(url.clone())),
        None => (None, None),
    }
}

fn destination_from_columns(
    question_id: Option<Uuid>,
    url: Option<String>,
) -> Option<Destination> {
    match (question_id, url) {
        (Some(question_id), _) => Some(Destination::Question { question_id }),
        (None, Some(url)) => Some(Destination::External { url }),
        (None, None) => None,
    }
}

// ============== Row types ==============

#[derive(sqlx::FromRow)]
struct QuestionnaireRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<QuestionnaireRow> for Questionnaire {
    type Error = StoreError;

    fn try_from(row: QuestionnaireRow) -> Result<Self, Self::Error> {
        let status: QuestionnaireStatus =
            row.status.parse().map_err(StoreError::Backend)?;
        Ok(Questionnaire {
            id: row.id,
            title: row.title,
            description: row.description,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: Uuid,
    questionnaire_id: Uuid,
    position: i32,
    content: String,
    description: Option<String>,
    kind: String,
}

impl TryFrom<QuestionRow> for Question {
    type Error = StoreError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse().map_err(StoreError::Backend)?;
        Ok(Question {
            id: row.id,
            questionnaire_id: row.questionnaire_id,
            order: row.position,
            content: row.content,
            description: row.description,
            kind,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AnswerRow {
    id: Uuid,
    question_id: Uuid,
    content: String,
    description: Option<String>,
    destination_question_id: Option<Uuid>,
    destination_url: Option<String>,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Answer {
            id: row.id,
            question_id: row.question_id,
            content: row.content,
            description: row.description,
            destination: destination_from_columns(
                row.destination_question_id,
                row.destination_url,
            ),
        }
    }
}

#[derive(sqlx::FromRow)]
struct BranchingRow {
    id: Uuid,
    questionnaire_id: Uuid,
    title: String,
    description: Option<String>,
    destination_question_id: Option<Uuid>,
    destination_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BranchingRow> for Branching {
    type Error = StoreError;

    fn try_from(row: BranchingRow) -> Result<Self, Self::Error> {
        let destination =
            destination_from_columns(row.destination_question_id, row.destination_url)
                .ok_or_else(|| {
                    StoreError::Backend(format!("branching {} has no destination", row.id))
                })?;
        Ok(Branching {
            id: row.id,
            questionnaire_id: row.questionnaire_id,
            title: row.title,
            description: row.description,
            destination,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ConditionRow {
    id: Uuid,
    branching_id: Uuid,
    question_id: Uuid,
    answer_ids: Vec<Uuid>,
}

impl From<ConditionRow> for Condition {
    fn from(row: ConditionRow) -> Self {
        Condition {
            id: row.id,
            branching_id: row.branching_id,
            question_id: row.question_id,
            answer_ids: row.answer_ids,
        }
    }
}

// ============== Store implementation ==============

#[async_trait]
impl QuestionnaireStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    async fn insert_questionnaire(&self, questionnaire: &Questionnaire) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO questionnaire (id, title, description, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(questionnaire.id)
        .bind(&questionnaire.title)
        .bind(&questionnaire.description)
        .bind(questionnaire.status.as_str())
        .bind(questionnaire.created_at)
        .bind(questionnaire.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fetch_questionnaire(
        &self,
        id: QuestionnaireId,
    ) -> StoreResult<Option<Questionnaire>> {
        let row = sqlx::query_as::<_, QuestionnaireRow>(
            "SELECT id, title, description, status, created_at, updated_at \
             FROM questionnaire WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(Questionnaire::try_from).transpose()
    }

    async fn list_questionnaires(
        &self,
        status: Option<QuestionnaireStatus>,
    ) -> StoreResult<Vec<Questionnaire>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, QuestionnaireRow>(
                    "SELECT id, title, description, status, created_at, updated_at \
                     FROM questionnaire WHERE status = $1 \
                     ORDER BY created_at DESC, id",
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, QuestionnaireRow>(
                    "SELECT id, title, description, status, created_at, updated_at \
                     FROM questionnaire WHERE status <> 'deleted' \
                     ORDER BY created_at DESC, id",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(map_sqlx)?;
        rows.into_iter().map(Questionnaire::try_from).collect()
    }

    async fn update_questionnaire(&self, questionnaire: &Questionnaire) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE questionnaire \
             SET title = $2, description = $3, status = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(questionnaire.id)
        .bind(&questionnaire.title)
        .bind(&questionnaire.description)
        .bind(questionnaire.status.as_str())
        .bind(questionnaire.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn insert_question(&self, question: &Question) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO question (id, questionnaire_id, position, content, description, kind) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(question.id)
        .bind(question.questionnaire_id)
        .bind(question.order)
        .bind(&question.content)
        .bind(&question.description)
        .bind(question.kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fetch_question(&self, id: QuestionId) -> StoreResult<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>(
            "SELECT id, questionnaire_id, position, content, description, kind \
             FROM question WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(Question::try_from).transpose()
    }

    async fn list_questions(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> StoreResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            "SELECT id, questionnaire_id, position, content, description, kind \
             FROM question WHERE questionnaire_id = $1 \
             ORDER BY position, id",
        )
        .bind(questionnaire_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(Question::try_from).collect()
    }

    async fn update_question(&self, question: &Question) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE question \
             SET position = $2, content = $3, description = $4, kind = $5 \
             WHERE id = $1",
        )
        .bind(question.id)
        .bind(question.order)
        .bind(&question.content)
        .bind(&question.description)
        .bind(question.kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn delete_question(&self, id: QuestionId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM question WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn reorder_questions(
        &self,
        questionnaire_id: QuestionnaireId,
        ordered: &[QuestionId],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        for (index, question_id) in ordered.iter().enumerate() {
            let result = sqlx::query(
                "UPDATE question SET position = $3 \
                 WHERE id = $1 AND questionnaire_id = $2",
            )
            .bind(question_id)
            .bind(questionnaire_id)
            .bind(index as i32 + 1)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
            if result.rows_affected() == 0 {
                tx.rollback().await.map_err(map_sqlx)?;
                return Err(StoreError::NoRows);
            }
        }
        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }

    async fn insert_answer(&self, answer: &Answer) -> StoreResult<()> {
        let (dest_question, dest_url) = destination_columns(answer.destination.as_ref());
        sqlx::query(
            "INSERT INTO answer \
             (id, question_id, content, description, destination_question_id, destination_url, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(answer.id)
        .bind(answer.question_id)
        .bind(&answer.content)
        .bind(&answer.description)
        .bind(dest_question)
        .bind(dest_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fetch_answer(&self, id: AnswerId) -> StoreResult<Option<Answer>> {
        let row = sqlx::query_as::<_, AnswerRow>(
            "SELECT id, question_id, content, description, destination_question_id, destination_url \
             FROM answer WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Answer::from))
    }

    async fn list_answers(&self, question_id: QuestionId) -> StoreResult<Vec<Answer>> {
        let rows = sqlx::query_as::<_, AnswerRow>(
            "SELECT id, question_id, content, description, destination_question_id, destination_url \
             FROM answer WHERE question_id = $1 \
             ORDER BY created_at, id",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Answer::from).collect())
    }

    async fn update_answer(&self, answer: &Answer) -> StoreResult<()> {
        let (dest_question, dest_url) = destination_columns(answer.destination.as_ref());
        let result = sqlx::query(
            "UPDATE answer \
             SET content = $2, description = $3, destination_question_id = $4, destination_url = $5 \
             WHERE id = $1",
        )
        .bind(answer.id)
        .bind(&answer.content)
        .bind(&answer.description)
        .bind(dest_question)
        .bind(dest_url)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn delete_answer(&self, id: AnswerId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM answer WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn insert_branching(&self, branching: &Branching) -> StoreResult<()> {
        let (dest_question, dest_url) = destination_columns(Some(&branching.destination));
        sqlx::query(
            "INSERT INTO branching \
             (id, questionnaire_id, title, description, destination_question_id, destination_url, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(branching.id)
        .bind(branching.questionnaire_id)
        .bind(&branching.title)
        .bind(&branching.description)
        .bind(dest_question)
        .bind(dest_url)
        .bind(branching.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fetch_branching(&self, id: BranchingId) -> StoreResult<Option<Branching>> {
        let row = sqlx::query_as::<_, BranchingRow>(
            "SELECT id, questionnaire_id, title, description, \
                    destination_question_id, destination_url, created_at \
             FROM branching WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(Branching::try_from).transpose()
    }

    async fn list_branchings(
        &self,
        questionnaire_id: QuestionnaireId,
    ) -> StoreResult<Vec<Branching>> {
        let rows = sqlx::query_as::<_, BranchingRow>(
            "SELECT id, questionnaire_id, title, description, \
                    destination_question_id, destination_url, created_at \
             FROM branching WHERE questionnaire_id = $1 \
             ORDER BY created_at, id",
        )
        .bind(questionnaire_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(Branching::try_from).collect()
    }

    async fn update_branching(&self, branching: &Branching) -> StoreResult<()> {
        let (dest_question, dest_url) = destination_columns(Some(&branching.destination));
        let result = sqlx::query(
            "UPDATE branching \
             SET title = $2, description = $3, destination_question_id = $4, destination_url = $5 \
             WHERE id = $1",
        )
        .bind(branching.id)
        .bind(&branching.title)
        .bind(&branching.description)
        .bind(dest_question)
        .bind(dest_url)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn delete_branching(&self, id: BranchingId) -> StoreResult<()> {
        // Conditions go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM branching WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn insert_condition(&self, condition: &Condition) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO branching_condition (id, branching_id, question_id, answer_ids, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(condition.id)
        .bind(condition.branching_id)
        .bind(condition.question_id)
        .bind(&condition.answer_ids)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fetch_condition(&self, id: ConditionId) -> StoreResult<Option<Condition>> {
        let row = sqlx::query_as::<_, ConditionRow>(
            "SELECT id, branching_id, question_id, answer_ids \
             FROM branching_condition WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Condition::from))
    }

    async fn list_conditions(&self, branching_id: BranchingId) -> StoreResult<Vec<Condition>> {
        let rows = sqlx::query_as::<_, ConditionRow>(
            "SELECT id, branching_id, question_id, answer_ids \
             FROM branching_condition WHERE branching_id = $1 \
             ORDER BY created_at, id",
        )
        .bind(branching_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Condition::from).collect())
    }

    async fn update_condition(&self, condition: &Condition) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE branching_condition \
             SET question_id = $2, answer_ids = $3 \
             WHERE id = $1",
        )
        .bind(condition.id)
        .bind(condition.question_id)
        .bind(&condition.answer_ids)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn delete_condition(&self, id: ConditionId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM branching_condition WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoRows);
        }
        Ok(())
    }

    async fn load_navigation(
        &self,
        questionnaire_id: QuestionnaireId,
        question_id: QuestionId,
    ) -> StoreResult<Option<NavigationSnapshot>> {
        let Some(current) = self.fetch_question(question_id).await? else {
            return Ok(None);
        };
        if current.questionnaire_id != questionnaire_id {
            return Ok(None);
        }

        let answers = self.list_answers(question_id).await?;
        let questions = self.list_questions(questionnaire_id).await?;
        let rules = self.list_branchings(questionnaire_id).await?;

        let mut branchings = Vec::with_capacity(rules.len());
        for branching in rules {
            let conditions = self.list_conditions(branching.id).await?;
            branchings.push((branching, conditions));
        }

        tracing::debug!(
            formway.db.questionnaire = %questionnaire_id,
            formway.db.question = %question_id,
            formway.db.branchings = branchings.len(),
            "Loaded navigation snapshot"
        );

        Ok(Some(NavigationSnapshot {
            current,
            answers,
            branchings,
            questions,
        }))
    }
}
