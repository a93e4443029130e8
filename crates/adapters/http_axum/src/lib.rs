//! # mailflow-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **REST-ish JSON API** for programmatic access
//!   (`/api/automations`, `/api/runs`, `/api/subscribers`, …)
//! - Expose the delay sweep as a worker endpoint so an external scheduler
//!   can drive it
//! - Stream run lifecycle events over Server-Sent Events
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map application results and errors into JSON responses
//!
//! ## Dependency rule
//! Depends on `mailflow-app` (for port traits and services) and `mailflow-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
mod test_support;
