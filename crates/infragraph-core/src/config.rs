//! Configuration for loading, querying, and validation.
//!
//! Load order: `.infragraph/config.toml` → environment variables → defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Top-level infragraph configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InfraGraphConfig {
    pub load: LoadConfig,
    pub query: QueryConfig,
    pub validation: ValidationConfig,
}

/// What the loader does with records that break referential integrity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Abort the load on the first integrity error.
    #[default]
    FailFast,
    /// Skip offending records and report every one of them.
    Collect,
}

impl FromStr for LoadPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(Self::FailFast),
            "collect" => Ok(Self::Collect),
            other => Err(format!("unknown load policy: {}", other)),
        }
    }
}

impl fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => write!(f, "fail_fast"),
            Self::Collect => write!(f, "collect"),
        }
    }
}

/// Bulk load configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub policy: LoadPolicy,
    /// Records applied between cancellation checks.
    pub batch_size: usize,
}

/// Query evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Evaluate transitive path patterns across input bindings in parallel.
    pub parallel_paths: bool,
    /// Minimum number of input bindings before a path pattern goes parallel.
    pub parallel_threshold: usize,
}

/// Shape validation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Stop after the first Violation-severity result.
    pub abort_on_first: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            policy: LoadPolicy::FailFast,
            batch_size: 10_000,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            parallel_paths: true,
            parallel_threshold: 64,
        }
    }
}

/// Helper to parse an env var and apply it to a config field. Unset or unparsable
/// values leave the field untouched.
fn env_override<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    target: &mut T,
) {
    if let Some(v) = lookup(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl InfraGraphConfig {
    /// Load config from `.infragraph/config.toml` in the project root, with env var
    /// overrides. Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".infragraph").join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        config.apply_env(&|var: &str| std::env::var(var).ok());

        if config.load.batch_size == 0 {
            anyhow::bail!("load.batch_size must be greater than zero");
        }

        Ok(config)
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        env_override(lookup, "INFRAGRAPH_LOAD_POLICY", &mut self.load.policy);
        env_override(lookup, "INFRAGRAPH_BATCH_SIZE", &mut self.load.batch_size);
        env_override(
            lookup,
            "INFRAGRAPH_PARALLEL_PATHS",
            &mut self.query.parallel_paths,
        );
        env_override(
            lookup,
            "INFRAGRAPH_PARALLEL_THRESHOLD",
            &mut self.query.parallel_threshold,
        );
        env_override(
            lookup,
            "INFRAGRAPH_ABORT_ON_FIRST",
            &mut self.validation.abort_on_first,
        );
    }
}
