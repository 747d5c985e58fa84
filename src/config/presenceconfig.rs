use std::time::Duration;

use serde::Deserialize;

fn default_retry_interval() -> u64 {
    500
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PresenceConfig {
    #[serde(default)]
    pub client_id: String,
    /// Milliseconds between two attempts at reaching Discord
    #[serde(default = "default_retry_interval")]
    pub retry_interval_ms: u64,
}

impl PresenceConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            retry_interval_ms: default_retry_interval(),
        }
    }
}
