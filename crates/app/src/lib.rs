//! # hookflow-app
//!
//! Application layer: use-cases, the execution engine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `WebhookRepository`: CRUD for webhooks
//!   - `AutomationRepository`: CRUD for automations and their steps
//!   - `ExecutionRecorder`: durable, incrementally updated execution log
//!   - `HttpClient`: one outbound HTTP request
//!   - `EventPublisher`: execution progress notifications
//! - Define **driving/inbound ports** as use-case structs:
//!   - `WebhookService`, `AutomationService`, `ExecutionService`
//!   - `ExecutionEngine`: run an automation's steps in order
//! - Provide **in-process infrastructure** (event bus, dispatcher with retry)
//!   that doesn't need IO of its own
//!
//! ## Dependency rule
//! Depends on `hookflow-domain` only (plus `tokio` and `tokio-util` for timers,
//! channels and cancellation). Never imports adapter crates. Adapters depend on
//! *this* crate, not the reverse.

pub mod condition_evaluator;
pub mod dispatcher;
pub mod event_bus;
pub mod execution_engine;
pub mod payload_renderer;
pub mod ports;
pub mod services;

#[cfg(test)]
mod testing;
