//! Configuration for calltrace.
//!
//! Layered: built-in defaults, then an optional YAML file, then environment
//! variables.

use crate::extract::{Denylist, DenylistConfig};
use crate::workspace::scan;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = ".calltrace.yaml";
pub const MIN_DEPTH: usize = 1;
pub const MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Depth used when a request does not name one (CALLTRACE_MAX_DEPTH)
    pub max_depth: usize,

    /// Files indexed concurrently per batch (CALLTRACE_BATCH_SIZE)
    pub batch_size: usize,

    /// Pause between indexing batches in milliseconds (CALLTRACE_BATCH_PAUSE_MS)
    pub batch_pause_ms: u64,

    /// Symbol-provider readiness polls before indexing anyway (CALLTRACE_READY_RETRIES)
    pub ready_retries: u32,

    /// Delay between readiness polls in milliseconds (CALLTRACE_READY_DELAY_MS)
    pub ready_delay_ms: u64,

    /// Files sampled per readiness poll (CALLTRACE_READY_SAMPLE)
    pub ready_sample: usize,

    /// Source file extensions to index
    pub extensions: Vec<String>,

    /// Glob patterns excluded from indexing
    pub exclude: Vec<String>,

    pub denylist: DenylistConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 3,
            batch_size: 10,
            batch_pause_ms: 50,
            ready_retries: 10,
            ready_delay_ms: 500,
            ready_sample: 3,
            extensions: scan::default_extensions(),
            exclude: scan::default_exclude_globs(),
            denylist: DenylistConfig::default(),
        }
    }
}

impl Config {
    /// Defaults, overlaid with `explicit` (or `<root>/.calltrace.yaml` when
    /// present), overlaid with the environment.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config.normalized())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = crate::util::read_to_string(path)?;
        Self::from_yaml(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml_ng::from_str(raw)?;
        Ok(config.normalized())
    }

    /// Overlay values from `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        env_override(&lookup, "CALLTRACE_MAX_DEPTH", &mut self.max_depth);
        env_override(&lookup, "CALLTRACE_BATCH_SIZE", &mut self.batch_size);
        env_override(&lookup, "CALLTRACE_BATCH_PAUSE_MS", &mut self.batch_pause_ms);
        env_override(&lookup, "CALLTRACE_READY_RETRIES", &mut self.ready_retries);
        env_override(&lookup, "CALLTRACE_READY_DELAY_MS", &mut self.ready_delay_ms);
        env_override(&lookup, "CALLTRACE_READY_SAMPLE", &mut self.ready_sample);
    }

    fn normalized(mut self) -> Self {
        self.max_depth = clamp_depth(self.max_depth);
        self.batch_size = self.batch_size.max(1);
        self.ready_sample = self.ready_sample.max(1);
        self
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn ready_delay(&self) -> Duration {
        Duration::from_millis(self.ready_delay_ms)
    }

    pub fn include_globs(&self) -> Vec<String> {
        scan::include_globs(&self.extensions)
    }

    pub fn denylist(&self) -> Denylist {
        Denylist::default().with_overrides(&self.denylist)
    }
}

pub fn clamp_depth(depth: usize) -> usize {
    depth.clamp(MIN_DEPTH, MAX_DEPTH)
}

fn env_override<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    let Some(val) = lookup(key) else {
        return;
    };
    match val.trim().parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => tracing::warn!("invalid {key} value: {val}, using: {target}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.ready_retries, 10);
        assert!(config.extensions.iter().any(|ext| ext == "rs"));
        assert!(config.exclude.iter().any(|glob| glob.contains("node_modules")));
    }

    #[test]
    fn yaml_overlays_defaults() {
        let config = Config::from_yaml(
            "max_depth: 25\nbatch_size: 4\ndenylist:\n  languages:\n    rust: [noise]\n",
        )
        .unwrap();
        assert_eq!(config.max_depth, MAX_DEPTH);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.ready_delay_ms, 500);
        assert!(config.denylist().names_for(Some("rust")).contains("noise"));
    }

    #[test]
    fn env_overrides_and_ignores_invalid_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CALLTRACE_BATCH_SIZE", "32"),
            ("CALLTRACE_READY_RETRIES", "many"),
        ]);
        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.ready_retries, 10);
    }

    #[test]
    fn depth_is_clamped() {
        assert_eq!(clamp_depth(0), 1);
        assert_eq!(clamp_depth(4), 4);
        assert_eq!(clamp_depth(99), 10);
    }
}
