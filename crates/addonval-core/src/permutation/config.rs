use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Start-time staggering and concurrency limits for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Runs per stagger group; `0` staggers every run linearly.
    pub batch_size: usize,
    /// Delay between consecutive groups.
    pub batch_delay_ms: u64,
    /// Delay between consecutive runs inside a group.
    pub run_delay_ms: u64,
    /// Upper bound on runs executing at once.
    pub max_concurrent: usize,
    /// Base name of the project each run deploys into.
    pub project_name: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            batch_delay_ms: 30_000,
            run_delay_ms: 2_000,
            max_concurrent: 16,
            project_name: "addonval".to_string(),
        }
    }
}

impl BatchConfig {
    /// Zero delays, for tests and local fixture replay.
    pub fn immediate() -> Self {
        Self {
            batch_delay_ms: 0,
            run_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn run_delay(&self) -> Duration {
        Duration::from_millis(self.run_delay_ms)
    }

    /// Delay before run `index` may start.
    pub fn stagger_delay(&self, index: usize) -> Duration {
        if self.batch_size == 0 {
            return self.run_delay() * index as u32;
        }
        let batch = (index / self.batch_size) as u32;
        let position = (index % self.batch_size) as u32;
        self.batch_delay() * batch + self.run_delay() * position
    }

    /// `max_concurrent`, never below one.
    pub fn permits(&self) -> usize {
        self.max_concurrent.max(1)
    }
}
