use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PlayerConfig {
    /// Path of mpv's IPC socket
    #[serde(default)]
    pub socket: String,
}
