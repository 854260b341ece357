//! Next-state resolution for a questionnaire traversal.
//!
//! The resolver is a pure function over already-loaded rows. Callers load
//! the current question, its answers, the questionnaire's branching rules
//! and question list, then ask for the next state; any persistence of the
//! selected answers is the caller's concern.
//!
//! Resolution precedence:
//! 1. the first branching rule (declaration order) whose conditions on the
//!    current question are all satisfied
//! 2. the first selected answer (answer order) carrying its own destination
//! 3. the question with the next-higher order in the same questionnaire
//! 4. terminal - the flow is complete

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{
    Answer, AnswerId, Branching, Condition, Destination, Question, QuestionId,
};

/// Transient request for one navigation step. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStateRequest {
    pub current_question_id: QuestionId,
    pub current_question_order: i32,
    pub selected_answer_ids: Vec<AnswerId>,
}

impl NextStateRequest {
    /// Boundary validation: a step with nothing selected is meaningless.
    pub fn validate(&self) -> Result<(), NavigationError> {
        if self.selected_answer_ids.is_empty() {
            return Err(NavigationError::EmptySelection);
        }
        Ok(())
    }
}

/// The explicit result of one navigation step.
///
/// "Control Flow as Data": instead of implicit nulls or sentinel ids, every
/// resolution returns exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NextState {
    /// Proceed to another question in the same questionnaire.
    #[serde(rename_all = "camelCase")]
    Question { next_question_id: QuestionId },

    /// Leave the questionnaire for an external URL.
    #[serde(rename_all = "camelCase")]
    Redirect { destination_url: String },

    /// End of flow - no question remains.
    Terminal,
}

impl From<Destination> for NextState {
    fn from(destination: Destination) -> Self {
        match destination {
            Destination::Question { question_id } => NextState::Question {
                next_question_id: question_id,
            },
            Destination::External { url } => NextState::Redirect {
                destination_url: url,
            },
        }
    }
}

/// Resolution failures. All of these are request-level validation faults;
/// the resolver itself has no IO to fail on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("selected answer set is empty")]
    EmptySelection,

    #[error("answer {answer_id} does not belong to question {question_id}")]
    ForeignAnswer {
        question_id: QuestionId,
        answer_id: AnswerId,
    },

    #[error("declared question order {declared} does not match stored order {actual}")]
    OrderMismatch { declared: i32, actual: i32 },
}

/// Everything the resolver needs, loaded up front.
///
/// `answers` are the current question's options in stored order; `branchings`
/// carry their conditions in declaration order; `questions` is the full
/// question list of the questionnaire ordered by `order`.
#[derive(Debug, Clone)]
pub struct NavigationSnapshot {
    pub current: Question,
    pub answers: Vec<Answer>,
    pub branchings: Vec<(Branching, Vec<Condition>)>,
    pub questions: Vec<Question>,
}

impl NavigationSnapshot {
    /// Resolve the next state for `request` against this snapshot.
    pub fn resolve(&self, request: &NextStateRequest) -> Result<NextState, NavigationError> {
        resolve_next_state(self, request)
    }
}

/// Compute the next state of a questionnaire traversal.
///
/// Pure over the snapshot: no side effects, no IO.
pub fn resolve_next_state(
    snapshot: &NavigationSnapshot,
    request: &NextStateRequest,
) -> Result<NextState, NavigationError> {
    request.validate()?;

    if request.current_question_order != snapshot.current.order {
        return Err(NavigationError::OrderMismatch {
            declared: request.current_question_order,
            actual: snapshot.current.order,
        });
    }

    let valid: HashSet<AnswerId> = snapshot.answers.iter().map(|a| a.id).collect();
    for answer_id in &request.selected_answer_ids {
        if !valid.contains(answer_id) {
            return Err(NavigationError::ForeignAnswer {
                question_id: snapshot.current.id,
                answer_id: *answer_id,
            });
        }
    }

    let selected: HashSet<AnswerId> = request.selected_answer_ids.iter().copied().collect();

    // Tier 1: branching rules, declaration order, first match wins.
    for (branching, conditions) in &snapshot.branchings {
        if branching_matches(snapshot.current.id, conditions, &selected) {
            tracing::debug!(
                formway.resolve.branching = %branching.id,
                formway.resolve.question = %snapshot.current.id,
                "Branching rule matched"
            );
            return Ok(NextState::from(branching.destination.clone()));
        }
    }

    // Tier 2: a selected answer carrying its own destination, answer order.
    for answer in &snapshot.answers {
        if selected.contains(&answer.id) {
            if let Some(destination) = &answer.destination {
                tracing::debug!(
                    formway.resolve.answer = %answer.id,
                    "Answer destination matched"
                );
                return Ok(NextState::from(destination.clone()));
            }
        }
    }

    // Tier 3: default pointer - the next-higher order in the questionnaire.
    let next = snapshot
        .questions
        .iter()
        .filter(|q| q.order > snapshot.current.order)
        .min_by_key(|q| q.order);
    if let Some(next) = next {
        return Ok(NextState::Question {
            next_question_id: next.id,
        });
    }

    // Tier 4: nothing remains.
    Ok(NextState::Terminal)
}

/// A branching is a candidate when it has at least one condition on the
/// current question and every such condition is satisfied. Conditions on
/// other questions are not evaluable in a single step and are skipped.
fn branching_matches(
    current_question_id: QuestionId,
    conditions: &[Condition],
    selected: &HashSet<AnswerId>,
) -> bool {
    let mut applicable = false;
    for condition in conditions {
        if condition.question_id != current_question_id {
            continue;
        }
        applicable = true;
        if !condition_satisfied(condition, selected) {
            return false;
        }
    }
    applicable
}

/// Any-of semantics: satisfied when the stored answer-id set intersects the
/// selected set.
fn condition_satisfied(condition: &Condition, selected: &HashSet<AnswerId>) -> bool {
    condition.answer_ids.iter().any(|id| selected.contains(id))
}
