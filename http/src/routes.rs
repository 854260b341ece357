//! Route table and request handlers.
//!
//! Paths carry at most one `{id}` segment; the matched endpoint plus that
//! id is everything a handler needs besides the body. Handlers return the
//! tagged service result and the dispatcher renders errors through the
//! boundary adapter.

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use formway_core::model::QuestionnaireStatus;
use formway_core::navigation::NextStateRequest;
use formway_service::{
    AnswerUpdate, BranchingUpdate, ConditionUpdate, NewAnswer, NewBranching, NewCondition,
    NewQuestion, NewQuestionnaire, QuestionUpdate, QuestionnaireUpdate, ServiceError,
};
use formway_store::QuestionnaireStore;

use crate::dto::{
    AnswerDto, BranchingDto, ConditionDto, CreateAnswerRequest, CreateBranchingRequest,
    CreateConditionRequest, CreateQuestionRequest, CreateQuestionnaireRequest, QuestionDto,
    QuestionnaireDto, ReorderQuestionsRequest, StatusChangeRequest, UpdateAnswerRequest,
    UpdateBranchingRequest, UpdateConditionRequest, UpdateQuestionRequest,
    UpdateQuestionnaireRequest,
};
use crate::error::{error_response, IngressError};
use crate::ingress::AppState;

/// One handler per route+method pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Health,
    CreateQuestionnaire,
    ListQuestionnaires,
    GetQuestionnaire,
    UpdateQuestionnaire,
    DeleteQuestionnaire,
    ChangeStatus,
    CreateQuestion,
    ListQuestions,
    ReorderQuestions,
    GetQuestion,
    UpdateQuestion,
    DeleteQuestion,
    CreateAnswer,
    ListAnswers,
    GetAnswer,
    UpdateAnswer,
    DeleteAnswer,
    CreateBranching,
    ListBranchings,
    GetBranching,
    UpdateBranching,
    DeleteBranching,
    CreateCondition,
    GetCondition,
    UpdateCondition,
    DeleteCondition,
    ResolveNextState,
}

/// Routes that matched a path share a `Vec` keyed by method, so an
/// unmatched method on a known path can answer 405 instead of 404.
pub type RouteTable = matchit::Router<Vec<(Method, Endpoint)>>;

pub fn router() -> Result<RouteTable, IngressError> {
    use Endpoint::*;

    fn insert(
        router: &mut RouteTable,
        path: &str,
        entries: Vec<(Method, Endpoint)>,
    ) -> Result<(), IngressError> {
        router
            .insert(path, entries)
            .map_err(|e| IngressError::RouteTable(e.to_string()))
    }

    let mut router = matchit::Router::new();
    insert(&mut router, "/health", vec![(Method::GET, Health)])?;
    insert(
        &mut router,
        "/questionnaires",
        vec![
            (Method::POST, CreateQuestionnaire),
            (Method::GET, ListQuestionnaires),
        ],
    )?;
    insert(
        &mut router,
        "/questionnaires/{id}",
        vec![
            (Method::GET, GetQuestionnaire),
            (Method::PUT, UpdateQuestionnaire),
            (Method::DELETE, DeleteQuestionnaire),
        ],
    )?;
    insert(
        &mut router,
        "/questionnaires/{id}/status",
        vec![(Method::POST, ChangeStatus)],
    )?;
    insert(
        &mut router,
        "/questionnaires/{id}/questions",
        vec![(Method::POST, CreateQuestion), (Method::GET, ListQuestions)],
    )?;
    insert(
        &mut router,
        "/questionnaires/{id}/questions/order",
        vec![(Method::PUT, ReorderQuestions)],
    )?;
    insert(
        &mut router,
        "/questionnaires/{id}/branchings",
        vec![
            (Method::POST, CreateBranching),
            (Method::GET, ListBranchings),
        ],
    )?;
    insert(
        &mut router,
        "/questionnaires/{id}/next-state",
        vec![(Method::POST, ResolveNextState)],
    )?;
    insert(
        &mut router,
        "/questions/{id}",
        vec![
            (Method::GET, GetQuestion),
            (Method::PUT, UpdateQuestion),
            (Method::DELETE, DeleteQuestion),
        ],
    )?;
    insert(
        &mut router,
        "/questions/{id}/answers",
        vec![(Method::POST, CreateAnswer), (Method::GET, ListAnswers)],
    )?;
    insert(
        &mut router,
        "/answers/{id}",
        vec![
            (Method::GET, GetAnswer),
            (Method::PUT, UpdateAnswer),
            (Method::DELETE, DeleteAnswer),
        ],
    )?;
    insert(
        &mut router,
        "/branchings/{id}",
        vec![
            (Method::GET, GetBranching),
            (Method::PUT, UpdateBranching),
            (Method::DELETE, DeleteBranching),
        ],
    )?;
    insert(
        &mut router,
        "/branchings/{id}/conditions",
        vec![(Method::POST, CreateCondition)],
    )?;
    insert(
        &mut router,
        "/conditions/{id}",
        vec![
            (Method::GET, GetCondition),
            (Method::PUT, UpdateCondition),
            (Method::DELETE, DeleteCondition),
        ],
    )?;
    Ok(router)
}

// ============== Response helpers ==============

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn no_content() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

// ============== Request helpers ==============

async fn read_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T, ServiceError> {
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| ServiceError::Validation(format!("failed to read body: {e}")))?
        .to_bytes();
    serde_json::from_slice(&bytes)
        .map_err(|e| ServiceError::Validation(format!("malformed request body: {e}")))
}

fn path_id(param: Option<&str>) -> Result<Uuid, ServiceError> {
    let raw = param.ok_or_else(|| ServiceError::Validation("missing path id".into()))?;
    raw.parse()
        .map_err(|_| ServiceError::Validation(format!("path id {raw:?} is not a UUID")))
}

fn status_filter(query: Option<&str>) -> Result<Option<QuestionnaireStatus>, ServiceError> {
    let Some(query) = query else {
        return Ok(None);
    };
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("status=") {
            return value
                .parse()
                .map(Some)
                .map_err(ServiceError::Validation);
        }
    }
    Ok(None)
}

// ============== Dispatch ==============

/// Run the matched endpoint and render any failure through the boundary
/// adapter.
pub async fn dispatch<S: QuestionnaireStore>(
    state: &AppState<S>,
    endpoint: Endpoint,
    param: Option<String>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    match handle(state, endpoint, param.as_deref(), req).await {
        Ok(response) => response,
        Err(err) => error_response(&err),
    }
}

async fn handle<S: QuestionnaireStore>(
    state: &AppState<S>,
    endpoint: Endpoint,
    param: Option<&str>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, ServiceError> {
    match endpoint {
        Endpoint::Health => {
            state.ping().await?;
            Ok(json(StatusCode::OK, &serde_json::json!({ "status": "ok" })))
        }

        // ============== Questionnaires ==============
        Endpoint::CreateQuestionnaire => {
            let body: CreateQuestionnaireRequest = read_json(req).await?;
            let questionnaire = state
                .questionnaires
                .create_questionnaire(NewQuestionnaire {
                    title: body.title,
                    description: body.description,
                })
                .await?;
            Ok(json(
                StatusCode::CREATED,
                &QuestionnaireDto::from(questionnaire),
            ))
        }
        Endpoint::ListQuestionnaires => {
            let status = status_filter(req.uri().query())?;
            let listed = state.questionnaires.list_questionnaires(status).await?;
            let dtos: Vec<QuestionnaireDto> =
                listed.into_iter().map(QuestionnaireDto::from).collect();
            Ok(json(StatusCode::OK, &dtos))
        }
        Endpoint::GetQuestionnaire => {
            let id = path_id(param)?;
            let questionnaire = state.questionnaires.get_questionnaire(id).await?;
            Ok(json(StatusCode::OK, &QuestionnaireDto::from(questionnaire)))
        }
        Endpoint::UpdateQuestionnaire => {
            let id = path_id(param)?;
            let body: UpdateQuestionnaireRequest = read_json(req).await?;
            let questionnaire = state
                .questionnaires
                .update_questionnaire(
                    id,
                    QuestionnaireUpdate {
                        title: body.title,
                        description: body.description,
                    },
                )
                .await?;
            Ok(json(StatusCode::OK, &QuestionnaireDto::from(questionnaire)))
        }
        Endpoint::DeleteQuestionnaire => {
            let id = path_id(param)?;
            state.questionnaires.delete_questionnaire(id).await?;
            Ok(no_content())
        }
        Endpoint::ChangeStatus => {
            let id = path_id(param)?;
            let body: StatusChangeRequest = read_json(req).await?;
            let questionnaire = state
                .questionnaires
                .transition_status(id, body.status)
                .await?;
            Ok(json(StatusCode::OK, &QuestionnaireDto::from(questionnaire)))
        }

        // ============== Questions ==============
        Endpoint::CreateQuestion => {
            let id = path_id(param)?;
            let body: CreateQuestionRequest = read_json(req).await?;
            let question = state
                .questionnaires
                .create_question(
                    id,
                    NewQuestion {
                        order: body.order,
                        content: body.content,
                        description: body.description,
                        kind: body.kind,
                    },
                )
                .await?;
            Ok(json(StatusCode::CREATED, &QuestionDto::from(question)))
        }
        Endpoint::ListQuestions => {
            let id = path_id(param)?;
            let listed = state.questionnaires.list_questions(id).await?;
            let dtos: Vec<QuestionDto> = listed.into_iter().map(QuestionDto::from).collect();
            Ok(json(StatusCode::OK, &dtos))
        }
        Endpoint::ReorderQuestions => {
            let id = path_id(param)?;
            let body: ReorderQuestionsRequest = read_json(req).await?;
            let reordered = state
                .questionnaires
                .reorder_questions(id, body.question_ids)
                .await?;
            let dtos: Vec<QuestionDto> =
                reordered.into_iter().map(QuestionDto::from).collect();
            Ok(json(StatusCode::OK, &dtos))
        }
        Endpoint::GetQuestion => {
            let id = path_id(param)?;
            let question = state.questionnaires.get_question(id).await?;
            Ok(json(StatusCode::OK, &QuestionDto::from(question)))
        }
        Endpoint::UpdateQuestion => {
            let id = path_id(param)?;
            let body: UpdateQuestionRequest = read_json(req).await?;
            let question = state
                .questionnaires
                .update_question(
                    id,
                    QuestionUpdate {
                        order: body.order,
                        content: body.content,
                        description: body.description,
                        kind: body.kind,
                    },
                )
                .await?;
            Ok(json(StatusCode::OK, &QuestionDto::from(question)))
        }
        Endpoint::DeleteQuestion => {
            let id = path_id(param)?;
            state.questionnaires.delete_question(id).await?;
            Ok(no_content())
        }

        // ============== Answers ==============
        Endpoint::CreateAnswer => {
            let id = path_id(param)?;
            let body: CreateAnswerRequest = read_json(req).await?;
            let answer = state
                .questionnaires
                .create_answer(
                    id,
                    NewAnswer {
                        content: body.content,
                        description: body.description,
                        destination: body.destination,
                    },
                )
                .await?;
            Ok(json(StatusCode::CREATED, &AnswerDto::from(answer)))
        }
        Endpoint::ListAnswers => {
            let id = path_id(param)?;
            let listed = state.questionnaires.list_answers(id).await?;
            let dtos: Vec<AnswerDto> = listed.into_iter().map(AnswerDto::from).collect();
            Ok(json(StatusCode::OK, &dtos))
        }
        Endpoint::GetAnswer => {
            let id = path_id(param)?;
            let answer = state.questionnaires.get_answer(id).await?;
            Ok(json(StatusCode::OK, &AnswerDto::from(answer)))
        }
        Endpoint::UpdateAnswer => {
            let id = path_id(param)?;
            let body: UpdateAnswerRequest = read_json(req).await?;
            let answer = state
                .questionnaires
                .update_answer(
                    id,
                    AnswerUpdate {
                        content: body.content,
                        description: body.description,
                        destination: body.destination,
                    },
                )
                .await?;
            Ok(json(StatusCode::OK, &AnswerDto::from(answer)))
        }
        Endpoint::DeleteAnswer => {
            let id = path_id(param)?;
            state.questionnaires.delete_answer(id).await?;
            Ok(no_content())
        }

        // ============== Branchings ==============
        Endpoint::CreateBranching => {
            let id = path_id(param)?;
            let body: CreateBranchingRequest = read_json(req).await?;
            let branching = state
                .questionnaires
                .create_branching(
                    id,
                    NewBranching {
                        title: body.title,
                        description: body.description,
                        destination: body.destination,
                    },
                )
                .await?;
            Ok(json(
                StatusCode::CREATED,
                &BranchingDto::from_parts(branching, Vec::new()),
            ))
        }
        Endpoint::ListBranchings => {
            let id = path_id(param)?;
            let listed = state.questionnaires.list_branchings(id).await?;
            let dtos: Vec<BranchingDto> = listed
                .into_iter()
                .map(|(branching, conditions)| BranchingDto::from_parts(branching, conditions))
                .collect();
            Ok(json(StatusCode::OK, &dtos))
        }
        Endpoint::GetBranching => {
            let id = path_id(param)?;
            let (branching, conditions) = state.questionnaires.get_branching(id).await?;
            Ok(json(
                StatusCode::OK,
                &BranchingDto::from_parts(branching, conditions),
            ))
        }
        Endpoint::UpdateBranching => {
            let id = path_id(param)?;
            let body: UpdateBranchingRequest = read_json(req).await?;
            let branching = state
                .questionnaires
                .update_branching(
                    id,
                    BranchingUpdate {
                        title: body.title,
                        description: body.description,
                        destination: body.destination,
                    },
                )
                .await?;
            let (branching, conditions) = state.questionnaires.get_branching(branching.id).await?;
            Ok(json(
                StatusCode::OK,
                &BranchingDto::from_parts(branching, conditions),
            ))
        }
        Endpoint::DeleteBranching => {
            let id = path_id(param)?;
            state.questionnaires.delete_branching(id).await?;
            Ok(no_content())
        }

        // ============== Conditions ==============
        Endpoint::CreateCondition => {
            let id = path_id(param)?;
            let body: CreateConditionRequest = read_json(req).await?;
            let condition = state
                .questionnaires
                .create_condition(
                    id,
                    NewCondition {
                        question_id: body.question_id,
                        answer_ids: body.answer_ids,
                    },
                )
                .await?;
            Ok(json(StatusCode::CREATED, &ConditionDto::from(condition)))
        }
        Endpoint::GetCondition => {
            let id = path_id(param)?;
            let condition = state.questionnaires.get_condition(id).await?;
            Ok(json(StatusCode::OK, &ConditionDto::from(condition)))
        }
        Endpoint::UpdateCondition => {
            let id = path_id(param)?;
            let body: UpdateConditionRequest = read_json(req).await?;
            let condition = state
                .questionnaires
                .update_condition(
                    id,
                    ConditionUpdate {
                        question_id: body.question_id,
                        answer_ids: body.answer_ids,
                    },
                )
                .await?;
            Ok(json(StatusCode::OK, &ConditionDto::from(condition)))
        }
        Endpoint::DeleteCondition => {
            let id = path_id(param)?;
            state.questionnaires.delete_condition(id).await?;
            Ok(no_content())
        }

        // ============== Navigation ==============
        Endpoint::ResolveNextState => {
            let id = path_id(param)?;
            let body: NextStateRequest = read_json(req).await?;
            let next = state.navigation.resolve(id, body).await?;
            Ok(json(StatusCode::OK, &next))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_matches_parameterized_paths() {
        let router = router().unwrap();

        let matched = router
            .at("/questionnaires/3fb31cdc-6f7d-4fbb-b44a-ffa23b2a5ca3")
            .unwrap();
        assert!(matched
            .value
            .iter()
            .any(|(m, e)| *m == Method::GET && *e == Endpoint::GetQuestionnaire));
        assert_eq!(
            matched.params.get("id"),
            Some("3fb31cdc-6f7d-4fbb-b44a-ffa23b2a5ca3")
        );

        let matched = router
            .at("/questionnaires/3fb31cdc-6f7d-4fbb-b44a-ffa23b2a5ca3/next-state")
            .unwrap();
        assert!(matched
            .value
            .iter()
            .any(|(m, e)| *m == Method::POST && *e == Endpoint::ResolveNextState));

        assert!(router.at("/nonsense").is_err());
    }

    #[test]
    fn test_nested_order_route_wins_over_question_param() {
        let router = router().unwrap();
        let matched = router
            .at("/questionnaires/3fb31cdc-6f7d-4fbb-b44a-ffa23b2a5ca3/questions/order")
            .unwrap();
        assert!(matched
            .value
            .iter()
            .any(|(_, e)| *e == Endpoint::ReorderQuestions));
    }

    #[test]
    fn test_path_id_rejects_non_uuid() {
        assert!(path_id(Some("not-a-uuid")).is_err());
        assert!(path_id(None).is_err());
        assert!(path_id(Some("3fb31cdc-6f7d-4fbb-b44a-ffa23b2a5ca3")).is_ok());
    }

    #[test]
    fn test_status_filter_parses_query() {
        assert_eq!(status_filter(None).unwrap(), None);
        assert_eq!(
            status_filter(Some("status=published")).unwrap(),
            Some(QuestionnaireStatus::Published)
        );
        assert_eq!(status_filter(Some("other=1")).unwrap(), None);
        assert!(status_filter(Some("status=bogus")).is_err());
    }
}
