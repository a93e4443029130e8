//! JSON REST handlers for persisted lifecycle events.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use mailflow_app::ports::{EventStore, Ports};
use mailflow_domain::error::{MailflowError, NotFoundError};
use mailflow_domain::event::Event;
use mailflow_domain::id::{EventId, RunId};

use crate::api::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Restrict to one run's history.
    pub run_id: Option<String>,
    pub limit: Option<usize>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Event>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<Event>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/events` — recent events, newest first.
pub async fn list<P, ES>(
    State(state): State<AppState<P, ES>>,
    Query(query): Query<ListQuery>,
) -> Result<ListResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let events = match query.run_id.as_deref() {
        Some(raw) => {
            let run_id: RunId = parse_id(raw)?;
            state.event_store.find_by_run(run_id, limit).await?
        }
        None => state.event_store.get_recent(limit).await?,
    };
    Ok(ListResponse::Ok(Json(events)))
}

/// `GET /api/events/{id}`
pub async fn get<P, ES>(
    State(state): State<AppState<P, ES>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let event_id: EventId = parse_id(&id)?;
    let event = state
        .event_store
        .get_by_id(event_id)
        .await?
        .ok_or_else(|| {
            ApiError::from(MailflowError::from(NotFoundError {
                entity: "Event",
                id,
            }))
        })?;
    Ok(GetResponse::Ok(Json(event)))
}
