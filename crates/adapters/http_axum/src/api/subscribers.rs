//! JSON REST handlers for subscribers and their group memberships.
//!
//! Every mutation here is a trigger source: the response carries the runs
//! it started.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use mailflow_app::ports::{EventStore, Ports};
use mailflow_app::services::subscriber_service::SubscriberProfile;
use mailflow_domain::error::MailflowError;
use mailflow_domain::id::{GroupId, LabelId, SubscriberId};
use mailflow_domain::run::Run;
use mailflow_domain::subscriber::Subscriber;

use crate::api::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSubscriberRequest {
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl CreateSubscriberRequest {
    fn into_subscriber(self) -> Result<Subscriber, MailflowError> {
        let mut builder = Subscriber::builder().email(self.email);
        if let Some(name) = self.name {
            builder = builder.name(name);
        }
        let mut subscriber = builder.build()?;
        for (key, value) in &self.fields {
            subscriber.set_field(key.clone(), value);
        }
        Ok(subscriber)
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub subscribers: Vec<CreateSubscriberRequest>,
}

/// A subscriber plus the runs its mutation started.
#[derive(Debug, Serialize)]
pub struct MutationBody {
    pub subscriber: Subscriber,
    pub runs: Vec<Run>,
}

#[derive(Debug, Serialize)]
pub struct ImportBody {
    pub imported: usize,
    pub subscribers: Vec<Subscriber>,
}

#[derive(Debug, Serialize)]
pub struct ProfileBody {
    #[serde(flatten)]
    pub subscriber: Subscriber,
    pub groups: Vec<GroupId>,
    pub labels: Vec<LabelId>,
}

impl From<SubscriberProfile> for ProfileBody {
    fn from(profile: SubscriberProfile) -> Self {
        Self {
            subscriber: profile.subscriber,
            groups: profile.groups,
            labels: profile.labels,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunsBody {
    pub runs: Vec<Run>,
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<MutationBody>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the import endpoint.
pub enum ImportResponse {
    Ok(Json<ImportBody>),
}

impl IntoResponse for ImportResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<ProfileBody>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the field update endpoint.
pub enum UpdateResponse {
    Ok(Json<MutationBody>),
}

impl IntoResponse for UpdateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the group membership endpoints.
pub enum MembershipResponse {
    Ok(Json<RunsBody>),
}

impl IntoResponse for MembershipResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
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

/// `POST /api/subscribers` — create a subscriber and fire `subject_created`.
pub async fn create<P, ES>(
    State(state): State<AppState<P, ES>>,
    Json(req): Json<CreateSubscriberRequest>,
) -> Result<CreateResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let subscriber = req.into_subscriber()?;
    let (subscriber, runs) = state
        .subscriber_service
        .create_subscriber(subscriber)
        .await?;
    Ok(CreateResponse::Created(Json(MutationBody {
        subscriber,
        runs,
    })))
}

/// `POST /api/subscribers/import` — bulk create, skipping known addresses.
pub async fn import<P, ES>(
    State(state): State<AppState<P, ES>>,
    Json(req): Json<ImportRequest>,
) -> Result<ImportResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let subscribers = req
        .subscribers
        .into_iter()
        .map(CreateSubscriberRequest::into_subscriber)
        .collect::<Result<Vec<_>, _>>()?;
    let created = state
        .subscriber_service
        .import_subscribers(subscribers)
        .await?;
    Ok(ImportResponse::Ok(Json(ImportBody {
        imported: created.len(),
        subscribers: created,
    })))
}

/// `GET /api/subscribers/{id}` — subscriber with its groups and labels.
pub async fn get<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let subscriber_id: SubscriberId = parse_id(&id)?;
    let profile = state
        .subscriber_service
        .get_subscriber(subscriber_id)
        .await?;
    Ok(GetResponse::Ok(Json(profile.into())))
}

/// `DELETE /api/subscribers/{id}` — cascades to runs and delay tickets.
pub async fn delete<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let subscriber_id: SubscriberId = parse_id(&id)?;
    state
        .subscriber_service
        .delete_subscriber(subscriber_id)
        .await?;
    Ok(DeleteResponse::NoContent)
}

/// `PATCH /api/subscribers/{id}/fields` — merge a JSON object into the
/// field bag and fire `field_changed`.
pub async fn update_fields<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
    Json(fields): Json<BTreeMap<String, serde_json::Value>>,
) -> Result<UpdateResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let subscriber_id: SubscriberId = parse_id(&id)?;
    let (subscriber, runs) = state
        .subscriber_service
        .update_fields(subscriber_id, fields)
        .await?;
    Ok(UpdateResponse::Ok(Json(MutationBody { subscriber, runs })))
}

/// `PUT /api/subscribers/{id}/groups/{group_id}` — fire `joined_group`.
pub async fn join_group<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path((id, group_id)): Path<(String, String)>,
) -> Result<MembershipResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let subscriber_id: SubscriberId = parse_id(&id)?;
    let group_id: GroupId = parse_id(&group_id)?;
    let runs = state
        .subscriber_service
        .join_group(subscriber_id, group_id)
        .await?;
    Ok(MembershipResponse::Ok(Json(RunsBody { runs })))
}

/// `DELETE /api/subscribers/{id}/groups/{group_id}` — fire `left_group`.
pub async fn leave_group<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path((id, group_id)): Path<(String, String)>,
) -> Result<MembershipResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let subscriber_id: SubscriberId = parse_id(&id)?;
    let group_id: GroupId = parse_id(&group_id)?;
    let runs = state
        .subscriber_service
        .leave_group(subscriber_id, group_id)
        .await?;
    Ok(MembershipResponse::Ok(Json(RunsBody { runs })))
}
