//! Reconciliation sweep configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Periodic re-check of PENDING orders whose notification never arrived
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between sweeps
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Only orders pending for at least this long are checked
    #[serde(default = "default_min_age")]
    pub min_age_minutes: i64,

    /// Maximum orders per sweep
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Concurrent provider checks
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Report what would change without touching orders
    #[serde(default)]
    pub dry_run: bool,
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn min_age(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.min_age_minutes)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_secs < 30 {
            return Err(ValidationError::InvalidSweep("interval_secs"));
        }
        if self.min_age_minutes < 1 {
            return Err(ValidationError::InvalidSweep("min_age_minutes"));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidSweep("batch_size"));
        }
        if self.concurrency == 0 || self.concurrency > 16 {
            return Err(ValidationError::InvalidSweep("concurrency"));
        }
        Ok(())
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval(),
            min_age_minutes: default_min_age(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            dry_run: false,
        }
    }
}

fn default_interval() -> u64 {
    300
}

fn default_min_age() -> i64 {
    15
}

fn default_batch_size() -> u32 {
    100
}

fn default_concurrency() -> usize {
    4
}
