// # Formway Application Layer
//
// Services sit between the HTTP boundary and the store: they enforce the
// ownership invariants of the entity hierarchy, run the questionnaire
// lifecycle state machine, and orchestrate navigation resolution. Every
// operation returns the tagged `ServiceResult`, which the boundary maps 1:1
// to a transport status code.

pub mod navigation;
pub mod questionnaires;
pub mod result;

// Re-exports for convenience
pub use navigation::NavigationService;
pub use questionnaires::{
    AnswerUpdate, BranchingUpdate, ConditionUpdate, NewAnswer, NewBranching, NewCondition,
    NewQuestion, NewQuestionnaire, QuestionnaireService, QuestionnaireUpdate, QuestionUpdate,
};
pub use result::{ServiceError, ServiceResult};
