//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod activity;
#[allow(clippy::missing_errors_doc)]
pub mod automations;
#[allow(clippy::missing_errors_doc)]
pub mod events;
#[allow(clippy::missing_errors_doc)]
pub mod runs;
pub mod sse;
#[allow(clippy::missing_errors_doc)]
pub mod subscribers;
#[allow(clippy::missing_errors_doc)]
pub mod triggers;
#[allow(clippy::missing_errors_doc)]
pub mod workers;

use std::str::FromStr;

use axum::Router;
use axum::routing::{get, patch, post, put};

use mailflow_app::ports::{EventStore, Ports};
use mailflow_domain::error::ValidationError;

use crate::error::ApiError;
use crate::state::AppState;

/// Parse a path or body identifier, reporting the raw text on failure.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    T::from_str(raw).map_err(|_| ValidationError::InvalidIdentifier(raw.to_string()).into())
}

/// Build the `/api` sub-router.
pub fn routes<P, ES>() -> Router<AppState<P, ES>>
where
    P: Ports,
    ES: EventStore + Send + Sync + 'static,
{
    Router::new()
        // Automations
        .route(
            "/automations",
            get(automations::list::<P, ES>).post(automations::create::<P, ES>),
        )
        .route(
            "/automations/{id}",
            get(automations::get::<P, ES>)
                .patch(automations::update::<P, ES>)
                .delete(automations::delete::<P, ES>),
        )
        .route(
            "/automations/{id}/resume",
            post(automations::reactivate::<P, ES>),
        )
        .route(
            "/automations/{id}/trigger",
            post(automations::trigger::<P, ES>),
        )
        // Runs
        .route("/runs", get(runs::list::<P, ES>))
        .route(
            "/runs/{id}",
            get(runs::get::<P, ES>).delete(runs::cancel::<P, ES>),
        )
        .route("/runs/{id}/pause", post(runs::pause::<P, ES>))
        .route("/runs/{id}/resume", post(runs::resume::<P, ES>))
        // Workers
        .route(
            "/workers/process-automation-delays",
            post(workers::process_delays::<P, ES>),
        )
        // Triggers
        .route("/triggers", post(triggers::fire::<P, ES>))
        // Subscribers
        .route("/subscribers", post(subscribers::create::<P, ES>))
        .route("/subscribers/import", post(subscribers::import::<P, ES>))
        .route(
            "/subscribers/{id}",
            get(subscribers::get::<P, ES>).delete(subscribers::delete::<P, ES>),
        )
        .route(
            "/subscribers/{id}/fields",
            patch(subscribers::update_fields::<P, ES>),
        )
        .route(
            "/subscribers/{id}/groups/{group_id}",
            put(subscribers::join_group::<P, ES>).delete(subscribers::leave_group::<P, ES>),
        )
        // Events
        .route("/events", get(events::list::<P, ES>))
        .route("/events/stream", get(sse::stream::<P, ES>))
        .route("/events/{id}", get(events::get::<P, ES>))
        // Activity
        .route("/activity", get(activity::list::<P, ES>))
}
