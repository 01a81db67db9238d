use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DispatchError, Result};
use crate::models::SessionState;

/// Format version written into every checkpoint
pub const CHECKPOINT_VERSION: u32 = 1;

/// Durable snapshot of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub session_id: String,
    pub saved_at: DateTime<Utc>,
    pub state: SessionState,
}

/// Only the version tag, read before trusting the rest of the document
#[derive(Deserialize)]
struct VersionProbe {
    version: Option<serde_json::Value>,
}

/// File-backed checkpoint storage, one file per session id
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    session_id: String,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Path of this session's checkpoint file
    pub fn path(&self) -> PathBuf {
        self.dir
            .join(format!("{}.checkpoint.json", self.session_id))
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Write the state atomically (temp file in the same directory, then rename)
    pub fn save(&self, state: &SessionState) -> Result<PathBuf> {
        let checkpoint = Checkpoint {
            version: CHECKPOINT_VERSION,
            session_id: self.session_id.clone(),
            saved_at: Utc::now(),
            state: state.clone(),
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| DispatchError::io(&self.dir, e))?;

        let path = self.path();
        let mut file =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| DispatchError::io(&self.dir, e))?;
        serde_json::to_writer_pretty(&mut file, &checkpoint).map_err(|e| {
            DispatchError::io(file.path(), std::io::Error::other(e))
        })?;
        file.flush().map_err(|e| DispatchError::io(file.path(), e))?;
        file.as_file()
            .sync_all()
            .map_err(|e| DispatchError::io(file.path(), e))?;
        file.persist(&path)
            .map_err(|e| DispatchError::io(&path, e.error))?;

        debug!(
            "Checkpoint saved to {:?} (current step: {})",
            path, state.current_step
        );
        Ok(path)
    }

    /// Load the stored state, all or nothing
    pub fn load(&self) -> Result<SessionState> {
        let path = self.path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DispatchError::NoCheckpoint {
                    session_id: self.session_id.clone(),
                });
            }
            Err(e) => return Err(DispatchError::io(&path, e)),
        };

        let corrupt = |reason: String| DispatchError::CheckpointCorrupt {
            path: path.clone(),
            reason,
        };

        let probe: VersionProbe =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
        match probe.version {
            Some(serde_json::Value::Number(n)) if n.as_u64() == Some(CHECKPOINT_VERSION as u64) => {}
            Some(other) => {
                return Err(DispatchError::CheckpointVersion {
                    found: other.to_string(),
                    supported: CHECKPOINT_VERSION,
                });
            }
            None => {
                return Err(DispatchError::CheckpointVersion {
                    found: "none".to_string(),
                    supported: CHECKPOINT_VERSION,
                });
            }
        }

        let checkpoint: Checkpoint =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;

        if !checkpoint.state.is_consistent() {
            return Err(corrupt(format!(
                "current step `{}` does not match completed steps",
                checkpoint.state.current_step
            )));
        }

        info!(
            "Loaded checkpoint for session {} saved at {}",
            checkpoint.session_id, checkpoint.saved_at
        );
        Ok(checkpoint.state)
    }

    /// Delete the checkpoint; returns whether a file was removed
    pub fn clear(&self) -> Result<bool> {
        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DispatchError::io(&path, e)),
        }
    }
}

/// Directory that holds checkpoints when none is configured
pub fn default_state_dir() -> &'static Path {
    Path::new(".dispatch")
}
