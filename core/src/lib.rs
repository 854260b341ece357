//! Formway Core - Questionnaire Domain Layer
//!
//! This crate defines the **domain** aspects of Formway:
//! - `model`: the entity arena (Questionnaire, Question, Answer, Branching, Condition)
//! - `navigation`: the pure next-state resolver
//!
//! **IMPORTANT**: This layer is Pure Rust - no HTTP, no IO, no Async.

pub mod model;
pub mod navigation;

pub use model::{
    Answer, AnswerId, Branching, BranchingId, Condition, ConditionId, Destination, Question,
    QuestionId, QuestionKind, Questionnaire, QuestionnaireId, QuestionnaireStatus,
};
pub use navigation::{
    NavigationError, NavigationSnapshot, NextState, NextStateRequest, resolve_next_state,
};
