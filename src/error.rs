use std::path::PathBuf;

use thiserror::Error;

use crate::models::{CurrentStep, StepKey};

/// Errors surfaced by the workflow core
///
/// Every variant carries enough detail for a caller to redisplay the
/// failing step. None of them is raised after a partial write to the
/// session state.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A step was submitted before its prerequisites were completed
    #[error("step `{step}` submitted out of order (current step is `{current}`)")]
    OutOfOrder { step: StepKey, current: CurrentStep },

    /// Missing or malformed fields in a submission
    #[error("step `{step}` failed validation: {}", .problems.join("; "))]
    Validation { step: StepKey, problems: Vec<String> },

    /// More items selected than the step allows
    #[error("step `{step}` accepts at most {limit} item(s), {submitted} submitted")]
    LimitExceeded {
        step: StepKey,
        limit: usize,
        submitted: usize,
    },

    /// Assembly attempted before a required step was completed
    #[error("cannot assemble: step `{missing}` is not complete")]
    IncompleteState { missing: StepKey },

    #[error("no checkpoint found for session `{session_id}`")]
    NoCheckpoint { session_id: String },

    #[error("checkpoint version {found} is not supported (expected {supported})")]
    CheckpointVersion { found: String, supported: u32 },

    #[error("checkpoint at {path:?} is corrupt: {reason}")]
    CheckpointCorrupt { path: PathBuf, reason: String },

    /// The text generator failed
    #[error("generation for step `{step}` via {collaborator} failed: {message}")]
    Generation {
        step: StepKey,
        collaborator: String,
        message: String,
    },

    /// The publisher failed
    #[error("publishing via {collaborator} failed: {message}")]
    Publish {
        collaborator: String,
        message: String,
    },

    #[error("unknown step `{0}`")]
    UnknownStep(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DispatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
