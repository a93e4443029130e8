//! Raw trigger intake for business events raised outside this service.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use mailflow_app::ports::{EventStore, Ports};
use mailflow_domain::automation::TriggerCategory;
use mailflow_domain::id::SubscriberId;
use mailflow_domain::run::Run;

use crate::api::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FireRequest {
    #[serde(alias = "trigger_type")]
    pub category: TriggerCategory,
    pub subscriber_id: String,
}

#[derive(Debug, Serialize)]
pub struct FireBody {
    pub runs: Vec<Run>,
}

/// Possible responses from the fire endpoint.
pub enum FireResponse {
    Ok(Json<FireBody>),
}

impl IntoResponse for FireResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/triggers` — start every active automation listening on
/// `category` for the subscriber.
pub async fn fire<P, ES>(
    State(state): State<AppState<P, ES>>,
    Json(req): Json<FireRequest>,
) -> Result<FireResponse, ApiError>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    let subscriber_id: SubscriberId = parse_id(&req.subscriber_id)?;
    let runs = state.triggers.on_event(req.category, subscriber_id).await?;
    Ok(FireResponse::Ok(Json(FireBody { runs })))
}
