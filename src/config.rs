pub mod pathconfig;
mod playerconfig;
mod presenceconfig;
mod syncconfig;

use serde::Deserialize;
use tracing::warn;

use crate::config::{
    pathconfig::PathConfig, playerconfig::PlayerConfig, presenceconfig::PresenceConfig,
    syncconfig::SyncConfig,
};

pub use pathconfig::PROJECT_NAME;

const CONFIG: &str = include_str!("../.config/config.json5");

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    /// Layers the user's config file, if any, over the built-in one.
    pub fn new(paths: &PathConfig) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(CONFIG, config::FileFormat::Json5));

        if let Some(config_dir) = &paths.config {
            let config_files = [
                ("config.json5", config::FileFormat::Json5),
                ("config.json", config::FileFormat::Json),
                ("config.yaml", config::FileFormat::Yaml),
                ("config.toml", config::FileFormat::Toml),
                ("config.ini", config::FileFormat::Ini),
            ];
            let mut found_config = false;
            for (file, format) in &config_files {
                let source = config::File::from(config_dir.join(file))
                    .format(*format)
                    .required(false);
                builder = builder.add_source(source);
                if config_dir.join(file).exists() {
                    found_config = true;
                }
            }
            if !found_config {
                warn!(
                    "No configuration file found in {}, using defaults",
                    config_dir.display()
                );
            }
        }

        builder.build()?.try_deserialize()
    }

    /// Positional arguments win over whatever the config file says.
    pub fn apply_args(&mut self, socket: Option<String>, client_id: Option<String>) {
        if let Some(socket) = socket {
            self.player.socket = socket;
        }
        if let Some(client_id) = client_id {
            self.presence.client_id = client_id;
        }
    }

    pub fn is_valid(&self) -> Option<String> {
        if self.player.socket.is_empty() {
            return Some("No mpv socket given, pass SOCKET or set player.socket".to_string());
        }
        if self.presence.client_id.is_empty() {
            return Some(
                "No Discord client ID given, pass CLIENT_ID or set presence.client_id".to_string(),
            );
        }
        if self.sync.interval_ms == 0 {
            return Some("sync.interval_ms must be greater than 0".to_string());
        }
        if self.presence.retry_interval_ms == 0 {
            return Some("presence.retry_interval_ms must be greater than 0".to_string());
        }
        None
    }
}
