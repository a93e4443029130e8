//! JSON REST handlers for run inspection and operator control.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use mailflow_app::ports::{EventStore, Ports, RunFilter};
use mailflow_domain::id::RunId;
use mailflow_domain::run::{Run, RunStatus};

use crate::api::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Query string for `GET /api/runs`. Every constraint is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub automation_id: Option<String>,
    pub subscriber_id: Option<String>,
    pub limit: Option<usize>,
}

impl ListQuery {
    fn into_filter(self) -> Result<RunFilter, ApiError> {
        Ok(RunFilter {
            status: self
                .status
                .as_deref()
                .map(RunStatus::from_str)
                .transpose()?,
            automation_id: self.automation_id.as_deref().map(parse_id).transpose()?,
            subscriber_id: self.subscriber_id.as_deref().map(parse_id).transpose()?,
            limit: self.limit,
        })
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Run>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get, pause and resume endpoints.
pub enum GetResponse {
    Ok(Json<Run>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the cancel endpoint.
pub enum CancelResponse {
    NoContent,
}

impl IntoResponse for CancelResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/runs` — list runs, newest first.
pub async fn list<P, ES>(
    State(state): State<AppState<P, ES>>,
    Query(query): Query<ListQuery>,
) -> Result<ListResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let runs = state.run_service.list_runs(query.into_filter()?).await?;
    Ok(ListResponse::Ok(Json(runs)))
}

/// `GET /api/runs/{id}`
pub async fn get<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let run_id: RunId = parse_id(&id)?;
    let run = state.run_service.get_run(run_id).await?;
    Ok(GetResponse::Ok(Json(run)))
}

/// `POST /api/runs/{id}/pause` — the next pass over the run halts.
pub async fn pause<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let run_id: RunId = parse_id(&id)?;
    let run = state.engine.pause_run(run_id).await?;
    Ok(GetResponse::Ok(Json(run)))
}

/// `POST /api/runs/{id}/resume` — clear the pause flag and continue a
/// halted pass.
pub async fn resume<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let run_id: RunId = parse_id(&id)?;
    let run = state.engine.resume_run(run_id).await?;
    Ok(GetResponse::Ok(Json(run)))
}

/// `DELETE /api/runs/{id}` — cancel a run and drop its pending ticket.
pub async fn cancel<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
) -> Result<CancelResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let run_id: RunId = parse_id(&id)?;
    state.engine.cancel_run(run_id).await?;
    Ok(CancelResponse::NoContent)
}
