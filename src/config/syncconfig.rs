use std::time::Duration;

use serde::Deserialize;

fn default_interval() -> u64 {
    5000
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SyncConfig {
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
        }
    }
}
