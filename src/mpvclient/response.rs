use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct MpvCommand<'a> {
    pub command: Vec<&'a str>,
    pub request_id: u64,
}

/// One line sent by mpv. Either a reply to a command (`request_id` set) or an event.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MpvMessage {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub request_id: Option<u64>,
    #[serde(default)]
    pub event: Option<String>,
}

pub const SUCCESS: &str = "success";
pub const UNAVAILABLE: &str = "property unavailable";

impl MpvMessage {
    pub fn is_reply(&self) -> bool {
        self.event.is_none() && self.request_id.is_some()
    }
}
