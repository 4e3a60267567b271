//! Scheduler option loading and validation.
//!
//! Options live under the `worker:` section of the NetPulse configuration
//! file; everything else in that file belongs to other components and is
//! ignored here. The expected YAML structure is:
//!
//! ```yaml
//! worker:
//!   scheduler: load_weighted_random
//!   bind_retries: 3
//!   weight_perturbation: 0.1
//! ```
//!
//! Every key has a default, so a missing section or field falls back
//! cleanly. An unknown policy name or an out-of-range perturbation is fatal:
//! the process should refuse to start rather than schedule with options it
//! did not understand.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::scheduler::policy::SchedulePolicy;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper matching the configuration file layout. Callers work
/// with [`SchedulerConfig`] instead.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    worker: WorkerSection,
}

/// The `worker:` section as it appears on disk.
#[derive(Debug, Deserialize)]
struct WorkerSection {
    #[serde(default = "default_scheduler")]
    scheduler: String,
    #[serde(default = "default_bind_retries")]
    bind_retries: u32,
    #[serde(default = "default_weight_perturbation")]
    weight_perturbation: f64,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            scheduler: default_scheduler(),
            bind_retries: default_bind_retries(),
            weight_perturbation: default_weight_perturbation(),
        }
    }
}

fn default_scheduler() -> String {
    SchedulePolicy::default().to_string()
}

fn default_bind_retries() -> u32 {
    3
}

fn default_weight_perturbation() -> f64 {
    0.1
}

// ── SchedulerConfig ───────────────────────────────────────────────────────────

/// Validated scheduler options.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Selection policy, from `worker.scheduler`.
    pub policy: SchedulePolicy,

    /// How many times a lost bind race restarts the whole attempt, from
    /// `worker.bind_retries`. The store's increment primitive is invoked at
    /// most `bind_retries + 1` times per scheduled task.
    pub bind_retries: u32,

    /// Weight perturbation epsilon for the weighted policy, from
    /// `worker.weight_perturbation`. Must lie in `[0, 1)`.
    pub weight_perturbation: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy: SchedulePolicy::default(),
            bind_retries: default_bind_retries(),
            weight_perturbation: default_weight_perturbation(),
        }
    }
}

impl SchedulerConfig {
    /// Parse and validate the `worker:` section of `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, the policy name is unknown, or the perturbation is outside
    /// `[0, 1)`.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot open configuration file: {}", path.display()))?;

        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML file: {}", path.display()))?;

        let config = Self::from_section(file.worker)?;
        info!(
            policy = %config.policy,
            bind_retries = config.bind_retries,
            weight_perturbation = config.weight_perturbation,
            "scheduler configuration loaded"
        );
        Ok(config)
    }

    fn from_section(worker: WorkerSection) -> Result<Self> {
        let policy = SchedulePolicy::parse(&worker.scheduler)
            .context("invalid worker.scheduler value")?;

        if !(0.0..1.0).contains(&worker.weight_perturbation) {
            bail!(
                "worker.weight_perturbation must be in [0, 1), got {}",
                worker.weight_perturbation
            );
        }

        Ok(Self {
            policy,
            bind_retries: worker.bind_retries,
            weight_perturbation: worker.weight_perturbation,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
