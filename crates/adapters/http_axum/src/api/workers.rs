//! Worker endpoint: an externally scheduled sweep of due delay tickets.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use mailflow_app::ports::{EventStore, Ports};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_MAX_PROCESSED: usize = 100;

/// Accepted both as query string and as JSON body; the query wins.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessDelaysRequest {
    pub max_processed: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ProcessDelaysBody {
    pub processed: usize,
}

/// Possible responses from the sweep endpoint.
pub enum ProcessDelaysResponse {
    Ok(Json<ProcessDelaysBody>),
}

impl IntoResponse for ProcessDelaysResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/workers/process-automation-delays`
///
/// Claims up to `max_processed` due tickets (default 100) and resumes their
/// runs. Safe to call concurrently with the in-process sweeper: every ticket
/// resumes its run at most once.
pub async fn process_delays<P, ES>(
    State(state): State<AppState<P, ES>>,
    Query(query): Query<ProcessDelaysRequest>,
    body: Option<Json<ProcessDelaysRequest>>,
) -> Result<ProcessDelaysResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let limit = query
        .max_processed
        .or_else(|| body.and_then(|Json(req)| req.max_processed))
        .unwrap_or(DEFAULT_MAX_PROCESSED);
    let processed = state.engine.sweep(limit).await?;
    Ok(ProcessDelaysResponse::Ok(Json(ProcessDelaysBody {
        processed,
    })))
}
