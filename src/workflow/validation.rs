use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::error::{DispatchError, Result};
use crate::models::{CandidateBatch, Entry, ItemRef, StepDefinition, Submission, SKIP_FIELD};

/// A submission that passed every check, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    pub fields: BTreeMap<String, Value>,
    pub selections: Vec<ItemRef>,
    /// Resolved selections followed by manual items
    pub entries: Vec<Entry>,
    /// `entries` as stored under the step's items field; `None` when empty
    pub stored_entries: Option<Value>,
    pub skipped: bool,
}

/// Validate a submission against its step definition
///
/// Checks, in order:
/// 1. Skip handling (only skippable steps, and no items alongside it)
/// 2. Selection limit (`LimitExceeded`)
/// 3. Required fields, optional field types, selection resolution, item
///    minimum and the step's own validator, reported together as `Validation`
///
/// Entries are serialized here so nothing can fail once the caller starts
/// writing.
pub fn validate_submission(
    definition: &StepDefinition,
    submission: &Submission,
    batch: Option<&CandidateBatch>,
) -> Result<ValidatedSubmission> {
    let step = definition.key;

    // 1. Skip
    if submission.is_skip() {
        let mut problems = Vec::new();
        if !definition.skippable {
            problems.push(format!("step `{}` cannot be skipped", step));
        }
        if submission.item_count() > 0 {
            problems.push("a skipped step cannot carry selections or items".to_string());
        }
        if !problems.is_empty() {
            return Err(DispatchError::Validation { step, problems });
        }

        let mut fields = BTreeMap::new();
        fields.insert(SKIP_FIELD.to_string(), Value::Bool(true));
        return Ok(ValidatedSubmission {
            fields,
            selections: Vec::new(),
            entries: Vec::new(),
            stored_entries: None,
            skipped: true,
        });
    }

    // 2. Limit
    let submitted = submission.item_count();
    if let Some(limit) = definition.max_selectable {
        if submitted > limit {
            return Err(DispatchError::LimitExceeded {
                step,
                limit,
                submitted,
            });
        }
    }

    // 3. Everything else
    let mut problems = Vec::new();

    for field in definition.required_fields {
        if submission.is_blank(field) {
            problems.push(format!("missing field `{}`", field));
        }
    }

    for field in definition.optional_fields {
        match submission.fields.get(*field) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => problems.push(format!("field `{}` must be a string", field)),
        }
    }

    let mut entries = Vec::with_capacity(submitted);
    if definition.accepts_items() {
        entries.extend(resolve_selections(&submission.selections, batch, &mut problems));
        entries.extend(submission.items.iter().cloned());

        if submitted < definition.min_items {
            problems.push(format!(
                "expected at least {} item(s), {} submitted",
                definition.min_items, submitted
            ));
        }
        for (i, entry) in submission.items.iter().enumerate() {
            if entry.title.trim().is_empty() {
                problems.push(format!("item {} has an empty title", i));
            }
        }
    } else if submitted > 0 {
        problems.push(format!("step `{}` does not take selections or items", step));
    }

    problems.extend((definition.validator)(submission));

    let stored_entries = match stored_value(&entries) {
        Ok(value) => value,
        Err(e) => {
            problems.push(format!("items could not be stored: {}", e));
            None
        }
    };

    if !problems.is_empty() {
        return Err(DispatchError::Validation { step, problems });
    }

    let fields = submission
        .fields
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(ValidatedSubmission {
        fields,
        selections: submission.selections.clone(),
        entries,
        stored_entries,
        skipped: false,
    })
}

fn stored_value(entries: &[Entry]) -> serde_json::Result<Option<Value>> {
    if entries.is_empty() {
        return Ok(None);
    }
    serde_json::to_value(entries).map(Some)
}

/// Resolve references against the step's current batch
fn resolve_selections(
    selections: &[ItemRef],
    batch: Option<&CandidateBatch>,
    problems: &mut Vec<String>,
) -> Vec<Entry> {
    if selections.is_empty() {
        return Vec::new();
    }

    let Some(batch) = batch else {
        problems.push("selections submitted but no candidates were offered".to_string());
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(selections.len());
    for selection in selections {
        if selection.batch_id != batch.batch_id {
            problems.push(format!(
                "selection {} refers to stale batch {}",
                selection.index, selection.batch_id
            ));
            continue;
        }
        if !seen.insert(selection.index) {
            problems.push(format!("index {} selected more than once", selection.index));
            continue;
        }
        match batch.get(selection.index) {
            Some(item) => entries.push(item.to_entry()),
            None => problems.push(format!(
                "index {} is out of range (batch has {} items)",
                selection.index,
                batch.len()
            )),
        }
    }
    entries
}
