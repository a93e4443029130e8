//! # mailflow-domain
//!
//! Pure domain model for the mailflow automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Automations** (named, ordered step lists started by a trigger category)
//! - Define the **Step catalog** (send message, wait, field/group/label mutations, chaining)
//! - Define **Runs** (one execution per definition and subscriber) and their state machine
//! - Define **Delay tickets** (durable resume markers for waiting runs)
//! - Define **Subscribers**, **Events** and **Activity entries**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod activity;
pub mod automation;
pub mod delay;
pub mod event;
pub mod run;
pub mod subscriber;
