use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CurrentStep, Entry, ItemRef, Region, StepKey, ITEMS_FIELD, SKIP_FIELD};

/// All confirmed selections and text of one workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Edition being produced
    pub region: Region,
    /// Steps submitted successfully
    pub completed_steps: BTreeSet<StepKey>,
    /// Lowest-order step not yet completed
    pub current_step: CurrentStep,
    /// Step-scoped values keyed `<step>.<field>`
    pub fields: BTreeMap<String, Value>,
    /// Candidate references per index-based step
    pub selections: BTreeMap<StepKey, Vec<ItemRef>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            region: Region::default(),
            completed_steps: BTreeSet::new(),
            current_step: next_incomplete(&BTreeSet::new()),
            fields: BTreeMap::new(),
            selections: BTreeMap::new(),
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self, step: StepKey) -> bool {
        self.completed_steps.contains(&step)
    }

    pub fn field(&self, step: StepKey, name: &str) -> Option<&Value> {
        self.fields.get(&step.field_key(name))
    }

    /// A string field, `None` when absent or blank
    pub fn text(&self, step: StepKey, name: &str) -> Option<&str> {
        self.field(step, name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn is_skipped(&self, step: StepKey) -> bool {
        matches!(self.field(step, SKIP_FIELD), Some(Value::Bool(true)))
    }

    /// Entries stored for an item-based step
    ///
    /// Malformed stored data degrades to an empty list.
    pub fn entries(&self, step: StepKey) -> Vec<Entry> {
        self.field(step, ITEMS_FIELD)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    /// URLs of the entries stored for `step`
    pub fn entry_urls(&self, step: StepKey) -> BTreeSet<String> {
        self.entries(step)
            .into_iter()
            .filter_map(|e| e.url)
            .collect()
    }

    /// Remove every field scoped to `step`
    pub(crate) fn clear_step(&mut self, step: StepKey) {
        let prefix = step.field_key("");
        self.fields.retain(|key, _| !key.starts_with(&prefix));
        self.selections.remove(&step);
    }

    /// Recompute `current_step` from `completed_steps`
    pub(crate) fn refresh_current_step(&mut self) {
        self.current_step = next_incomplete(&self.completed_steps);
    }

    /// Whether `current_step` agrees with `completed_steps`
    pub fn is_consistent(&self) -> bool {
        self.current_step == next_incomplete(&self.completed_steps)
    }
}

/// The first step, in workflow order, missing from `completed`
pub fn next_incomplete(completed: &BTreeSet<StepKey>) -> CurrentStep {
    StepKey::ALL
        .iter()
        .copied()
        .find(|key| !completed.contains(key))
        .map(CurrentStep::Step)
        .unwrap_or(CurrentStep::Done)
}
