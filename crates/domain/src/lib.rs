//! # hookflow-domain
//!
//! Pure domain model for the hookflow webhook automation system.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Webhooks** (reusable HTTP call definitions)
//! - Define **Automations** (trigger + ordered arena of **Steps**)
//! - Define **Conditions** (versioned guard schema evaluated against a context)
//! - Define **Payload templates** (`{{token}}` substitution, dynamic rule selection)
//! - Define **Executions** (run records, per-step results, status transitions)
//! - Define the **retry policy** and dispatch request/response types
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod automation;
pub mod context;
pub mod dispatch;
pub mod event;
pub mod execution;
pub mod payload;
pub mod retry;
pub mod webhook;
