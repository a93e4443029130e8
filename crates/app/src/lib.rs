//! # mailflow-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `AutomationRepository`, `RunRepository`, `DelayQueue` — engine state
//!   - `SubscriberRepository`, `MembershipStore` — the subject store
//!   - `MessageSender` — outbound delivery
//!   - `EventPublisher`, `EventStore`, `ActivityLog` — observability seams
//! - Define **driving/inbound ports** as use-case structs:
//!   - `AutomationEngine` — run state machine, delay sweep, pause/resume/cancel
//!   - `TriggerResolver` — business event → runs
//!   - `AutomationService`, `RunService`, `SubscriberService` — CRUD and queries
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `mailflow-domain` only (plus `tokio::sync`/`tokio::time`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod automation_engine;
pub mod event_bus;
pub mod ports;
pub mod services;
pub mod trigger_resolver;

#[cfg(test)]
mod test_support;
