use serde::Serialize;
use serde_repr::Serialize_repr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr)]
#[repr(u8)]
pub enum ActivityKind {
    Listening = 2,
    Watching = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Assets {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub large_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub large_text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub small_image: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub small_text: String,
}

/// Epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timestamps {
    pub start: i64,
    pub end: i64,
}

/// The "now playing" card shown on the user's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub assets: Assets,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
}
