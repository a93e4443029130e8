//! JSON REST handlers for automation definitions.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use mailflow_app::automation_engine::StartOutcome;
use mailflow_app::ports::{EventStore, Ports};
use mailflow_app::services::automation_service::AutomationUpdate;
use mailflow_domain::automation::{Action, Automation, Step, TriggerCategory};
use mailflow_domain::id::{AutomationId, RunId, SubscriberId};
use mailflow_domain::run::RunStatus;
use mailflow_domain::time::Timestamp;

use crate::api::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// One step as authored: a tag plus a JSON payload.
#[derive(Debug, Deserialize)]
pub struct RawStep {
    #[serde(alias = "type")]
    pub step_type: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    /// Position hint. Steps are stably sorted by it, then renumbered from `0`.
    pub order: Option<u32>,
}

/// Sort by `order` (falling back to list position) and decode strictly.
pub(crate) fn decode_steps(raw: Vec<RawStep>) -> Result<Vec<Action>, ApiError> {
    let mut keyed: Vec<(u32, RawStep)> = (0u32..)
        .zip(raw)
        .map(|(position, step)| (step.order.unwrap_or(position), step))
        .collect();
    keyed.sort_by_key(|(key, _)| *key);

    (0u32..)
        .zip(keyed)
        .map(|(order, (_, step))| {
            Step::decode_strict(order, &step.step_type, step.payload.as_ref())
                .map(|s| s.action)
                .map_err(ApiError::from)
        })
        .collect()
}

/// Request body for creating an automation.
#[derive(Deserialize)]
pub struct CreateAutomationRequest {
    pub name: String,
    #[serde(alias = "trigger_type")]
    pub trigger: TriggerCategory,
    #[serde(alias = "is_active")]
    pub active: Option<bool>,
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

/// Request body for a partial update. Absent fields are left untouched.
#[derive(Deserialize)]
pub struct UpdateAutomationRequest {
    pub name: Option<String>,
    #[serde(alias = "is_active")]
    pub active: Option<bool>,
    pub steps: Option<Vec<RawStep>>,
}

#[derive(Deserialize)]
pub struct TriggerRequest {
    pub subscriber_id: String,
}

#[derive(Debug, Serialize)]
pub struct StepBody {
    pub order: u32,
    pub step_type: String,
    pub payload: Option<serde_json::Value>,
}

/// Wire representation of an [`Automation`].
#[derive(Debug, Serialize)]
pub struct AutomationBody {
    pub id: AutomationId,
    pub name: String,
    pub trigger: TriggerCategory,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub steps: Vec<StepBody>,
}

impl From<Automation> for AutomationBody {
    fn from(automation: Automation) -> Self {
        Self {
            id: automation.id,
            name: automation.name,
            trigger: automation.trigger,
            active: automation.active,
            created_at: automation.created_at,
            updated_at: automation.updated_at,
            steps: automation
                .steps
                .into_iter()
                .map(|step| StepBody {
                    order: step.order,
                    step_type: step.action.step_type().to_string(),
                    payload: step.action.payload(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunStarted {
    pub run_id: RunId,
    pub status: RunStatus,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<AutomationBody>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get, update and resume endpoints.
pub enum GetResponse {
    Ok(Json<AutomationBody>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<AutomationBody>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// Possible responses from the manual trigger endpoint.
pub enum TriggerResponse {
    Started(Json<RunStarted>),
    NoSteps,
}

impl IntoResponse for TriggerResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Started(json) => json.into_response(),
            Self::NoSteps => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "automation has no steps"})),
            )
                .into_response(),
        }
    }
}

/// `GET /api/automations` — list all definitions.
pub async fn list<P, ES>(State(state): State<AppState<P, ES>>) -> Result<ListResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let automations = state.automation_service.list_automations().await?;
    Ok(ListResponse::Ok(Json(
        automations.into_iter().map(AutomationBody::from).collect(),
    )))
}

/// `GET /api/automations/{id}` — get a definition by ID.
pub async fn get<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    let automation = state
        .automation_service
        .get_automation(automation_id)
        .await?;
    Ok(GetResponse::Ok(Json(automation.into())))
}

/// `POST /api/automations` — create a definition.
pub async fn create<P, ES>(
    State(state): State<AppState<P, ES>>,
    Json(req): Json<CreateAutomationRequest>,
) -> Result<CreateResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let mut builder = Automation::builder().name(req.name).trigger(req.trigger);
    if let Some(active) = req.active {
        builder = builder.active(active);
    }
    for action in decode_steps(req.steps)? {
        builder = builder.step(action);
    }

    let automation = builder.build()?;
    let created = state
        .automation_service
        .create_automation(automation)
        .await?;
    Ok(CreateResponse::Created(Json(created.into())))
}

/// `PATCH /api/automations/{id}` — partial update, optionally replacing steps.
pub async fn update<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAutomationRequest>,
) -> Result<GetResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    let update = AutomationUpdate {
        name: req.name,
        active: req.active,
        steps: req.steps.map(decode_steps).transpose()?,
    };
    let updated = state
        .automation_service
        .update_automation(automation_id, update)
        .await?;
    Ok(GetResponse::Ok(Json(updated.into())))
}

/// `DELETE /api/automations/{id}` — delete a definition with its runs.
pub async fn delete<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    state
        .automation_service
        .delete_automation(automation_id)
        .await?;
    Ok(DeleteResponse::NoContent)
}

/// `POST /api/automations/{id}/resume` — set the definition active again.
pub async fn reactivate<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    let automation = state.automation_service.reactivate(automation_id).await?;
    Ok(GetResponse::Ok(Json(automation.into())))
}

/// `POST /api/automations/{id}/trigger` — start a run for one subscriber,
/// regardless of the definition's trigger category or active flag.
pub async fn trigger<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
    Json(req): Json<TriggerRequest>,
) -> Result<TriggerResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    let subscriber_id: SubscriberId = parse_id(&req.subscriber_id)?;
    match state.engine.start_run(automation_id, subscriber_id).await? {
        StartOutcome::Started(run) => Ok(TriggerResponse::Started(Json(RunStarted {
            run_id: run.id,
            status: run.status,
        }))),
        StartOutcome::NoSteps => Ok(TriggerResponse::NoSteps),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailflow_domain::error::{MailflowError, ValidationError};

    fn raw(step_type: &str, payload: serde_json::Value, order: Option<u32>) -> RawStep {
        RawStep {
            step_type: step_type.to_string(),
            payload: Some(payload),
            order,
        }
    }

    #[test]
    fn should_sort_steps_by_order_and_renumber() {
        let actions = decode_steps(vec![
            raw("wait", serde_json::json!({"minutes": 5}), Some(10)),
            raw(
                "send_message",
                serde_json::json!({"subject": "Hi", "body": "x"}),
                Some(2),
            ),
        ])
        .unwrap();

        assert_eq!(
            actions,
            vec![
                Action::SendMessage {
                    subject: "Hi".to_string(),
                    body: "x".to_string(),
                },
                Action::Wait { minutes: 5 },
            ]
        );
    }

    #[test]
    fn should_accept_legacy_tags_and_fields() {
        let actions = decode_steps(vec![
            raw("email", serde_json::json!({"subject": "Hi", "html": "x"}), None),
            raw("delay", serde_json::json!({"delay_minutes": 3}), None),
        ])
        .unwrap();

        assert_eq!(actions[1], Action::Wait { minutes: 3 });
    }

    #[test]
    fn should_reject_malformed_step_with_its_position() {
        let err = decode_steps(vec![
            raw("wait", serde_json::json!({"minutes": 1}), None),
            raw("wait", serde_json::json!({"minutes": "soon"}), None),
        ])
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(
            err.into_inner(),
            MailflowError::Validation(ValidationError::MalformedStep { order: 1, .. })
        ));
    }
}
