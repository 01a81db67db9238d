use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{info, warn};

use super::checkpoint::CheckpointStore;
use super::validation::{validate_submission, ValidatedSubmission};
use crate::aggregate::{aggregate, AggregateConfig, KeywordTable};
use crate::error::{DispatchError, Result};
use crate::models::{
    CandidateBatch, CurrentStep, RawItem, Region, SessionState, StepDefinition, StepKey,
    Submission, ITEMS_FIELD,
};

/// Snapshot of workflow progress for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub completed: Vec<StepKey>,
    pub all_steps: Vec<StepKey>,
    pub current_step: CurrentStep,
    pub region: Region,
}

/// Owns the session state and is the only thing that mutates it
///
/// Every successful submission is persisted before it becomes visible in
/// memory, so a crash can only lose the submission in flight.
pub struct StepMachine {
    steps: Vec<StepDefinition>,
    store: CheckpointStore,
    state: SessionState,
    batches: HashMap<StepKey, CandidateBatch>,
    aggregate_config: AggregateConfig,
    keyword_override: Option<KeywordTable>,
}

impl StepMachine {
    /// Start an empty session backed by `store`
    pub fn new(store: CheckpointStore) -> Self {
        Self {
            steps: crate::models::workflow(),
            store,
            state: SessionState::new(),
            batches: HashMap::new(),
            aggregate_config: AggregateConfig::default(),
            keyword_override: None,
        }
    }

    pub fn with_aggregate_config(mut self, config: AggregateConfig) -> Self {
        self.aggregate_config = config;
        self
    }

    /// Use `table` instead of the built-in regional keyword tables
    pub fn with_keyword_table(mut self, table: KeywordTable) -> Self {
        self.keyword_override = Some(table);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_step(&self) -> CurrentStep {
        self.state.current_step
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    pub fn definition(&self, step: StepKey) -> &StepDefinition {
        // `steps` is built from StepKey::ALL, so every key is present
        &self.steps[step as usize]
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.state.completed_steps.iter().copied().collect(),
            all_steps: self.steps.iter().map(|d| d.key).collect(),
            current_step: self.state.current_step,
            region: self.state.region,
        }
    }

    /// The batch currently offered for `step`, if any
    pub fn candidates(&self, step: StepKey) -> Option<&CandidateBatch> {
        self.batches.get(&step)
    }

    /// Aggregate freshly fetched items and offer them for `step`
    ///
    /// Replaces any earlier batch for the step, which makes references into
    /// it stale.
    pub fn offer(&mut self, step: StepKey, raw: Vec<RawItem>) -> &CandidateBatch {
        let definition = *self.definition(step);
        let table = self.keyword_table(&definition);

        let raw = if step == StepKey::MoreArticles {
            let featured = self.state.entry_urls(StepKey::Articles);
            raw.into_iter()
                .filter(|item| item.url.as_ref().is_none_or(|url| !featured.contains(url)))
                .collect()
        } else {
            raw
        };

        let batch = CandidateBatch::new(aggregate(&raw, &table, &self.aggregate_config));
        info!(
            "Offered {} candidates for step {} (batch {}, {} flagged as duplicates)",
            batch.len(),
            step,
            batch.batch_id,
            batch.duplicate_pairs().count()
        );

        self.batches.insert(step, batch);
        &self.batches[&step]
    }

    fn keyword_table(&self, definition: &StepDefinition) -> KeywordTable {
        match &self.keyword_override {
            Some(table) => table.clone(),
            None if definition.cross_region => KeywordTable::global(),
            None => KeywordTable::for_region(self.state.region),
        }
    }

    /// Validate and record a step submission
    ///
    /// Allowed for the current step and for any completed step (a
    /// correction, which does not move `current_step`).
    pub fn submit(&mut self, step: StepKey, submission: Submission) -> Result<&SessionState> {
        if !self.state.is_complete(step) && self.state.current_step != CurrentStep::Step(step) {
            return Err(DispatchError::OutOfOrder {
                step,
                current: self.state.current_step,
            });
        }

        let definition = *self.definition(step);
        let validated = validate_submission(&definition, &submission, self.batches.get(&step))?;

        let mut next = self.state.clone();
        apply(&mut next, step, validated);

        self.store.save(&next)?;
        let resubmitted = self.state.is_complete(step);
        self.state = next;

        info!(
            "Step {} {} (current step: {})",
            step,
            if resubmitted { "updated" } else { "completed" },
            self.state.current_step
        );
        Ok(&self.state)
    }

    /// Clear the session and delete its checkpoint
    pub fn reset(&mut self) {
        self.state = SessionState::new();
        self.batches.clear();
        match self.store.clear() {
            Ok(true) => info!("Session {} reset, checkpoint removed", self.store.session_id()),
            Ok(false) => info!("Session {} reset", self.store.session_id()),
            Err(e) => warn!("Session reset but checkpoint could not be removed: {}", e),
        }
    }

    /// Replace the in-memory state with the stored checkpoint
    ///
    /// On error the current state is left untouched.
    pub fn resume(&mut self) -> Result<&SessionState> {
        let state = self.store.load()?;
        self.state = state;
        self.batches.clear();
        info!(
            "Resumed session {}: completed [{}], current step {}",
            self.store.session_id(),
            join_steps(&self.state.completed_steps),
            self.state.current_step
        );
        Ok(&self.state)
    }
}

/// Write a validated submission into `state`
fn apply(state: &mut SessionState, step: StepKey, validated: ValidatedSubmission) {
    state.clear_step(step);

    for (name, value) in validated.fields {
        state.fields.insert(step.field_key(&name), value);
    }

    if step == StepKey::Region {
        if let Some(region) = state
            .text(step, "region")
            .and_then(|r| r.parse::<Region>().ok())
        {
            state.region = region;
        }
    }

    if let Some(entries) = validated.stored_entries {
        state.fields.insert(step.field_key(ITEMS_FIELD), entries);
    }
    if !validated.selections.is_empty() {
        state.selections.insert(step, validated.selections);
    }

    state.completed_steps.insert(step);
    state.refresh_current_step();
}

fn join_steps(steps: &BTreeSet<StepKey>) -> String {
    steps
        .iter()
        .map(StepKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
