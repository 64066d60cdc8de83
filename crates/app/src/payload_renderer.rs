//! Fail-soft payload rendering for dispatch.

use hookflow_domain::context::Context;
use hookflow_domain::payload;
use hookflow_domain::webhook::Webhook;

/// Render `webhook`'s payload template against `ctx`.
///
/// A dynamic template that cannot be parsed is logged and rendered as a
/// plain template so the step still dispatches.
#[must_use]
pub fn render_payload(webhook: &Webhook, ctx: &Context) -> String {
    match payload::render(&webhook.payload_template, webhook.payload_type, ctx) {
        Ok(rendered) => rendered,
        Err(err) => {
            tracing::warn!(
                webhook_id = %webhook.id,
                error = %err,
                "invalid payload template, falling back to plain substitution"
            );
            payload::substitute(&webhook.payload_template, ctx)
        }
    }
}
