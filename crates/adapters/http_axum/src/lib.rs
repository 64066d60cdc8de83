//! # hookflow-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** for programmatic access
//!   (`/api/webhooks`, `/api/automations`, `/api/executions`, `/api/forms`)
//! - Stream execution progress as **Server-Sent Events**
//!   (`/api/executions/stream`)
//! - Map HTTP requests into application service and engine calls (driving adapter)
//! - Map application results and [`HookflowError`](hookflow_domain::error::HookflowError)
//!   into HTTP responses
//!
//! ## Dependency rule
//! Depends on `hookflow-app` (for port traits, services and the engine) and
//! `hookflow-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
mod testing;
