//! Trigger: what starts an automation.

use serde::{Deserialize, Serialize};

/// Describes how an automation is started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Started explicitly through the API.
    #[default]
    Manual,
    /// Started when a form is submitted.
    FormSubmission {
        /// Only this form; any form when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        form_id: Option<String>,
    },
    /// Stored schedule (e.g. `"0 8 * * *"`). Never fired by a timer.
    Schedule {
        cron: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
    },
}

impl Trigger {
    /// Whether a submission of `form_id` should start this automation.
    #[must_use]
    pub fn matches_form(&self, form_id: &str) -> bool {
        match self {
            Self::FormSubmission { form_id: None } => true,
            Self::FormSubmission {
                form_id: Some(expected),
            } => expected == form_id,
            Self::Manual | Self::Schedule { .. } => false,
        }
    }

    /// Storage label of the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::FormSubmission { .. } => "form_submission",
            Self::Schedule { .. } => "schedule",
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::FormSubmission { form_id: None } => f.write_str("form_submission(*)"),
            Self::FormSubmission {
                form_id: Some(form_id),
            } => write!(f, "form_submission({form_id})"),
            Self::Schedule { cron, .. } => write!(f, "schedule({cron})"),
        }
    }
}
