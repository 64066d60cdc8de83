//! Steps and the ordered arena they live in.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::id::{AutomationId, StepId, WebhookId};

/// One unit of work: call a webhook, with delay, retry, condition and failure policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub automation_id: AutomationId,
    pub webhook_id: WebhookId,
    pub step_order: u32,
    pub is_conditional: bool,
    /// Raw condition document, parsed when the step runs.
    #[serde(default)]
    pub condition_config: Option<Value>,
    #[serde(default)]
    pub delay_seconds: u64,
    pub retry_on_failure: bool,
    pub continue_on_failure: bool,
}

impl Step {
    #[must_use]
    pub fn builder(automation_id: AutomationId, webhook_id: WebhookId) -> StepBuilder {
        StepBuilder {
            id: StepId::new(),
            automation_id,
            webhook_id,
            step_order: 0,
            condition_config: None,
            delay_seconds: 0,
            retry_on_failure: true,
            continue_on_failure: false,
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }
}

/// Builder for [`Step`]. Retries default on, continue-on-failure off.
#[derive(Debug)]
pub struct StepBuilder {
    id: StepId,
    automation_id: AutomationId,
    webhook_id: WebhookId,
    step_order: u32,
    condition_config: Option<Value>,
    delay_seconds: u64,
    retry_on_failure: bool,
    continue_on_failure: bool,
}

impl StepBuilder {
    #[must_use]
    pub fn id(mut self, id: StepId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn step_order(mut self, order: u32) -> Self {
        self.step_order = order;
        self
    }

    /// Guard the step with a condition document.
    #[must_use]
    pub fn condition(mut self, config: Value) -> Self {
        self.condition_config = Some(config);
        self
    }

    #[must_use]
    pub fn delay_seconds(mut self, seconds: u64) -> Self {
        self.delay_seconds = seconds;
        self
    }

    #[must_use]
    pub fn retry_on_failure(mut self, enabled: bool) -> Self {
        self.retry_on_failure = enabled;
        self
    }

    #[must_use]
    pub fn continue_on_failure(mut self, enabled: bool) -> Self {
        self.continue_on_failure = enabled;
        self
    }

    #[must_use]
    pub fn build(self) -> Step {
        Step {
            id: self.id,
            automation_id: self.automation_id,
            webhook_id: self.webhook_id,
            step_order: self.step_order,
            is_conditional: self.condition_config.is_some(),
            condition_config: self.condition_config,
            delay_seconds: self.delay_seconds,
            retry_on_failure: self.retry_on_failure,
            continue_on_failure: self.continue_on_failure,
        }
    }
}

/// Steps of an automation keyed by `step_order`.
///
/// Iteration is always ascending by order, whatever order the steps were
/// inserted or stored in. Orders are unique; changing them goes through
/// [`StepSequence::renumber`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Step>", into = "Vec<Step>")]
pub struct StepSequence(BTreeMap<u32, Step>);

impl StepSequence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a step at its own `step_order`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateStepOrder`] when the slot is taken.
    pub fn insert(&mut self, step: Step) -> Result<(), ValidationError> {
        if self.0.contains_key(&step.step_order) {
            return Err(ValidationError::DuplicateStepOrder(step.step_order));
        }
        self.0.insert(step.step_order, step);
        Ok(())
    }

    /// Remove a step by id, leaving a gap in the numbering.
    pub fn remove(&mut self, step_id: StepId) -> Option<Step> {
        let order = self.0.values().find(|s| s.id == step_id)?.step_order;
        self.0.remove(&order)
    }

    #[must_use]
    pub fn get(&self, step_id: StepId) -> Option<&Step> {
        self.0.values().find(|s| s.id == step_id)
    }

    /// Steps in ascending `step_order`.
    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.0.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The order a newly appended step should take.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::StepOrderExhausted`] when the highest order
    /// is already `u32::MAX`.
    pub fn next_order(&self) -> Result<u32, ValidationError> {
        match self.0.keys().next_back() {
            None => Ok(1),
            Some(&last) => last
                .checked_add(1)
                .ok_or(ValidationError::StepOrderExhausted(last)),
        }
    }

    /// Assign orders `1..=n` following `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownStep`] for an id not in the sequence
    /// and [`ValidationError::IncompleteReorder`] unless `ids` names every
    /// step exactly once. The sequence is unchanged on error.
    pub fn renumber(&mut self, ids: &[StepId]) -> Result<(), ValidationError> {
        if let Some(unknown) = ids.iter().find(|id| self.get(**id).is_none()) {
            return Err(ValidationError::UnknownStep(*unknown));
        }
        let mut seen = ids.to_vec();
        seen.sort_by_key(|id| id.as_uuid());
        seen.dedup();
        if seen.len() != ids.len() || ids.len() != self.0.len() {
            return Err(ValidationError::IncompleteReorder);
        }

        let mut by_id: Vec<Step> = std::mem::take(&mut self.0).into_values().collect();
        for (position, id) in ids.iter().enumerate() {
            if let Some(idx) = by_id.iter().position(|s| s.id == *id) {
                let mut step = by_id.swap_remove(idx);
                step.step_order = u32::try_from(position + 1).unwrap_or(u32::MAX);
                self.0.insert(step.step_order, step);
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<Step>> for StepSequence {
    type Error = ValidationError;

    fn try_from(steps: Vec<Step>) -> Result<Self, Self::Error> {
        let mut sequence = Self::new();
        for step in steps {
            sequence.insert(step)?;
        }
        Ok(sequence)
    }
}

impl From<StepSequence> for Vec<Step> {
    fn from(sequence: StepSequence) -> Self {
        sequence.0.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(automation_id: AutomationId, order: u32) -> Step {
        Step::builder(automation_id, WebhookId::new())
            .step_order(order)
            .build()
    }

    #[test]
    fn should_iterate_in_ascending_order_regardless_of_insertion() {
        let aid = AutomationId::new();
        let mut seq = StepSequence::new();
        for order in [3, 1, 2] {
            seq.insert(step(aid, order)).unwrap();
        }
        let orders: Vec<u32> = seq.iter().map(|s| s.step_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn should_reject_duplicate_step_order() {
        let aid = AutomationId::new();
        let mut seq = StepSequence::new();
        seq.insert(step(aid, 1)).unwrap();
        assert_eq!(
            seq.insert(step(aid, 1)),
            Err(ValidationError::DuplicateStepOrder(1))
        );
    }

    #[test]
    fn should_mark_step_conditional_when_condition_given() {
        let s = Step::builder(AutomationId::new(), WebhookId::new())
            .condition(serde_json::json!({"version": 1}))
            .build();
        assert!(s.is_conditional);
        assert!(s.retry_on_failure);
        assert!(!s.continue_on_failure);
    }

    #[test]
    fn should_append_after_highest_order() {
        let aid = AutomationId::new();
        let mut seq = StepSequence::new();
        assert_eq!(seq.next_order().unwrap(), 1);
        seq.insert(step(aid, 5)).unwrap();
        assert_eq!(seq.next_order().unwrap(), 6);
    }

    #[test]
    fn should_refuse_to_append_after_max_order() {
        let aid = AutomationId::new();
        let mut seq = StepSequence::new();
        seq.insert(step(aid, u32::MAX)).unwrap();
        assert_eq!(
            seq.next_order(),
            Err(ValidationError::StepOrderExhausted(u32::MAX))
        );
    }

    #[test]
    fn should_remove_step_by_id() {
        let aid = AutomationId::new();
        let mut seq = StepSequence::new();
        let s = step(aid, 2);
        let id = s.id;
        seq.insert(s).unwrap();
        assert!(seq.remove(id).is_some());
        assert!(seq.is_empty());
        assert!(seq.remove(id).is_none());
    }

    #[test]
    fn should_renumber_following_given_ids() {
        let aid = AutomationId::new();
        let mut seq = StepSequence::new();
        let (a, b, c) = (step(aid, 10), step(aid, 20), step(aid, 30));
        let ids = [c.id, a.id, b.id];
        for s in [a, b, c] {
            seq.insert(s).unwrap();
        }
        seq.renumber(&ids).unwrap();
        let ordered: Vec<(u32, StepId)> = seq.iter().map(|s| (s.step_order, s.id)).collect();
        assert_eq!(ordered, vec![(1, ids[0]), (2, ids[1]), (3, ids[2])]);
    }

    #[test]
    fn should_reject_incomplete_or_duplicated_reorder() {
        let aid = AutomationId::new();
        let mut seq = StepSequence::new();
        let (a, b) = (step(aid, 1), step(aid, 2));
        let (ida, idb) = (a.id, b.id);
        seq.insert(a).unwrap();
        seq.insert(b).unwrap();
        assert_eq!(seq.renumber(&[ida]), Err(ValidationError::IncompleteReorder));
        assert_eq!(
            seq.renumber(&[ida, ida]),
            Err(ValidationError::IncompleteReorder)
        );
        let unknown = StepId::new();
        assert_eq!(
            seq.renumber(&[ida, unknown]),
            Err(ValidationError::UnknownStep(unknown))
        );
        assert_eq!(seq.get(idb).unwrap().step_order, 2);
    }

    #[test]
    fn should_reject_duplicate_orders_when_deserializing() {
        let aid = AutomationId::new();
        let steps = vec![step(aid, 1), step(aid, 1)];
        let json = serde_json::to_value(&steps).unwrap();
        assert!(serde_json::from_value::<StepSequence>(json).is_err());
    }
}
