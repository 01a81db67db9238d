use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::aggregate::{AggregateConfig, KeywordTable};
use crate::assemble::AssemblerConfig;
use crate::workflow::{default_state_dir, CheckpointStore, StepMachine};

pub const DEFAULT_SESSION: &str = "default";

/// Top-level configuration shared by the CLI and library callers
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Directory holding checkpoints (DISPATCH_STATE_DIR)
    pub state_dir: PathBuf,
    /// Directory receiving assembled documents (DISPATCH_OUTPUT_DIR)
    pub output_dir: PathBuf,
    /// Session id naming the checkpoint file (DISPATCH_SESSION)
    pub session_id: String,
    /// Keyword table replacing the built-in ones (DISPATCH_KEYWORDS)
    pub keywords_path: Option<PathBuf>,
    pub aggregate: AggregateConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir().to_path_buf(),
            output_dir: AssemblerConfig::default().output_dir,
            session_id: DEFAULT_SESSION.to_string(),
            keywords_path: None,
            aggregate: AggregateConfig::default(),
        }
    }
}

impl DispatchConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `get`
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = var("DISPATCH_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("DISPATCH_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(session) = var("DISPATCH_SESSION") {
            config.session_id = session.trim().to_string();
        }
        if let Some(path) = var("DISPATCH_KEYWORDS") {
            config.keywords_path = Some(PathBuf::from(path));
        }
        if let Some(threshold) = var("DISPATCH_DUP_THRESHOLD") {
            let threshold: f64 = threshold
                .trim()
                .parse()
                .with_context(|| format!("Invalid DISPATCH_DUP_THRESHOLD: {:?}", threshold))?;
            if !(0.0..=1.0).contains(&threshold) {
                anyhow::bail!("DISPATCH_DUP_THRESHOLD must be within 0..=1, got {}", threshold);
            }
            config.aggregate.duplicate_threshold = threshold;
        }

        Ok(config)
    }

    pub fn checkpoint_store(&self) -> CheckpointStore {
        CheckpointStore::new(&self.state_dir, &self.session_id)
    }

    pub fn assembler_config(&self) -> AssemblerConfig {
        AssemblerConfig {
            output_dir: self.output_dir.clone(),
            ..AssemblerConfig::default()
        }
    }

    /// A fresh machine wired to this configuration (not yet resumed)
    pub fn machine(&self) -> Result<StepMachine> {
        let mut machine =
            StepMachine::new(self.checkpoint_store()).with_aggregate_config(self.aggregate.clone());
        if let Some(path) = &self.keywords_path {
            let table = KeywordTable::from_json_file(path)
                .with_context(|| format!("Failed to load keyword table {:?}", path))?;
            machine = machine.with_keyword_table(table);
        }
        Ok(machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.state_dir, PathBuf::from(".dispatch"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.session_id, DEFAULT_SESSION);
        assert_eq!(config.aggregate.duplicate_threshold, 0.65);
    }

    #[test]
    fn test_overrides() {
        let config = DispatchConfig::from_lookup(lookup(&[
            ("DISPATCH_STATE_DIR", "/tmp/state"),
            ("DISPATCH_OUTPUT_DIR", "/tmp/out"),
            ("DISPATCH_SESSION", "eu-week-4"),
            ("DISPATCH_DUP_THRESHOLD", "0.8"),
        ]))
        .unwrap();
        assert_eq!(config.state_dir, PathBuf::from("/tmp/state"));
        assert_eq!(config.assembler_config().output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(
            config.checkpoint_store().path(),
            PathBuf::from("/tmp/state/eu-week-4.checkpoint.json")
        );
        assert_eq!(config.aggregate.duplicate_threshold, 0.8);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(DispatchConfig::from_lookup(lookup(&[("DISPATCH_DUP_THRESHOLD", "high")])).is_err());
        assert!(DispatchConfig::from_lookup(lookup(&[("DISPATCH_DUP_THRESHOLD", "1.5")])).is_err());
    }

    #[test]
    fn test_missing_keyword_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DispatchConfig {
            state_dir: dir.path().to_path_buf(),
            keywords_path: Some(dir.path().join("missing.json")),
            ..DispatchConfig::default()
        };
        assert!(config.machine().is_err());
    }
}
