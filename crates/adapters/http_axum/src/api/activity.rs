//! Read-only view over the activity log.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use mailflow_app::ports::{ActivityLog, EventStore, Ports};
use mailflow_domain::activity::ActivityEntry;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<ActivityEntry>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/activity` — newest entries first.
pub async fn list<P, ES>(
    State(state): State<AppState<P, ES>>,
    Query(query): Query<ListQuery>,
) -> Result<ListResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let entries = state
        .ports
        .activity
        .get_recent(query.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(ListResponse::Ok(Json(entries)))
}
