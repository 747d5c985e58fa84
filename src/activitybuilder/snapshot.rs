use std::collections::HashMap;

use tracing::trace;

use crate::activitybuilder::BuildError;
use crate::ipcerror::IpcError;
use crate::mpvclient::propertyvalue::PropertyValue;
use crate::mpvclient::PlayerChannel;

/// Whether a property is read as its raw JSON value or as mpv's display string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    Raw,
    Text,
}

pub const PROPERTIES: [(&str, Fetch); 22] = [
    ("mpv-version", Fetch::Text),
    ("media-title", Fetch::Text),
    ("metadata/by-key/Title", Fetch::Raw),
    ("metadata/by-key/Artist", Fetch::Raw),
    ("metadata/by-key/Album", Fetch::Raw),
    ("speed", Fetch::Text),
    ("height", Fetch::Text),
    ("container-fps", Fetch::Text),
    ("video-format", Fetch::Text),
    ("video-bitrate", Fetch::Text),
    ("audio-codec-name", Fetch::Text),
    ("audio-bitrate", Fetch::Text),
    ("stream-path", Fetch::Text),
    ("file-size", Fetch::Text),
    ("paused-for-cache", Fetch::Raw),
    ("pause", Fetch::Raw),
    ("loop-file", Fetch::Text),
    ("percent-pos", Fetch::Raw),
    ("playlist-count", Fetch::Raw),
    ("playlist-pos-1", Fetch::Raw),
    ("duration", Fetch::Raw),
    ("time-pos", Fetch::Raw),
];

static NULL: PropertyValue = PropertyValue::Null;

/// Everything read from the player during one cycle. Any property may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSnapshot {
    values: HashMap<String, PropertyValue>,
}

impl PlaybackSnapshot {
    /// Reads every property in [`PROPERTIES`]. Properties the player does not have (or refuses to
    /// report) are left out. A failing socket aborts the whole sample.
    pub async fn sample<C: PlayerChannel>(channel: &mut C) -> Result<Self, IpcError> {
        let mut snapshot = Self::default();
        for (key, fetch) in PROPERTIES {
            let result = match fetch {
                Fetch::Raw => channel.get_property(key).await,
                Fetch::Text => channel.get_property_string(key).await.map(|s| {
                    if s.is_empty() {
                        PropertyValue::Null
                    } else {
                        PropertyValue::String(s)
                    }
                }),
            };
            match result {
                Ok(value) => snapshot.set(key, value),
                Err(e) if e.is_transport() => return Err(e),
                Err(e) => trace!("{}: {}", key, e),
            }
        }
        Ok(snapshot)
    }

    pub fn set(&mut self, key: &str, value: impl Into<PropertyValue>) {
        let value = value.into();
        if value.is_null() {
            self.values.remove(key);
        } else {
            self.values.insert(key.to_string(), value);
        }
    }

    #[cfg(test)]
    pub fn with(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> &PropertyValue {
        self.values.get(key).unwrap_or(&NULL)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Non-empty display string
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            PropertyValue::String(s) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Display string parsed as a float. Unparseable strings count as absent.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Display string parsed as an integer. Unparseable strings count as absent.
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            PropertyValue::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Result<Option<bool>, BuildError> {
        self.get(key)
            .as_bool()
            .map_err(|m| BuildError::mismatch(key, m))
    }

    pub fn raw_number(&self, key: &str) -> Result<Option<f64>, BuildError> {
        self.get(key)
            .as_f64()
            .map_err(|m| BuildError::mismatch(key, m))
    }

    pub fn raw_str(&self, key: &str) -> Result<Option<&str>, BuildError> {
        self.get(key)
            .as_str()
            .map_err(|m| BuildError::mismatch(key, m))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    /// Answers from a fixed table; `broken_after` makes every request past that count fail like
    /// a dead socket
    struct TablePlayer {
        raw: HashMap<&'static str, PropertyValue>,
        text: HashMap<&'static str, &'static str>,
        calls: usize,
        broken_after: Option<usize>,
    }

    impl TablePlayer {
        fn check(&mut self) -> Result<(), IpcError> {
            self.calls += 1;
            match self.broken_after {
                Some(n) if self.calls > n => Err(IpcError::io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                ))),
                _ => Ok(()),
            }
        }
    }

    impl PlayerChannel for TablePlayer {
        async fn open(&mut self, _endpoint: &str) -> Result<(), IpcError> {
            Ok(())
        }

        async fn get_property(&mut self, key: &str) -> Result<PropertyValue, IpcError> {
            self.check()?;
            self.raw
                .get(key)
                .cloned()
                .ok_or_else(|| IpcError::unavailable(key))
        }

        async fn get_property_string(&mut self, key: &str) -> Result<String, IpcError> {
            self.check()?;
            match key {
                "speed" => Err(IpcError::rejected("error running command".to_string())),
                _ => Ok(self.text.get(key).copied().unwrap_or_default().to_string()),
            }
        }

        fn is_closed(&self) -> bool {
            false
        }

        async fn close(&mut self) -> Result<(), IpcError> {
            Ok(())
        }
    }

    fn player() -> TablePlayer {
        TablePlayer {
            raw: HashMap::from([
                ("pause", PropertyValue::Bool(false)),
                ("time-pos", PropertyValue::Number(12.5)),
                ("duration", PropertyValue::Number(200.0)),
            ]),
            text: HashMap::from([("media-title", "song.flac"), ("height", "")]),
            calls: 0,
            broken_after: None,
        }
    }

    #[tokio::test]
    async fn test_sample_partial() {
        let mut p = player();
        let snapshot = PlaybackSnapshot::sample(&mut p).await.unwrap();
        assert_eq!(p.calls, PROPERTIES.len());
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.text("media-title"), Some("song.flac"));
        assert_eq!(snapshot.text("height"), None);
        assert_eq!(snapshot.number("speed"), None);
        assert_eq!(snapshot.raw_number("time-pos").unwrap(), Some(12.5));
        assert_eq!(snapshot.flag("paused-for-cache").unwrap(), None);
    }

    #[tokio::test]
    async fn test_sample_broken() {
        let mut p = player();
        p.broken_after = Some(3);
        let err = PlaybackSnapshot::sample(&mut p).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(p.calls, 4);
    }

    #[test]
    fn test_parsed_accessors() {
        let snapshot = PlaybackSnapshot::default()
            .with("speed", "1.500000")
            .with("video-bitrate", "8000000")
            .with("audio-bitrate", "garbage")
            .with("pause", 3.0_f64);
        assert_eq!(snapshot.number("speed"), Some(1.5));
        assert_eq!(snapshot.integer("video-bitrate"), Some(8_000_000));
        assert_eq!(snapshot.integer("audio-bitrate"), None);
        assert!(snapshot.flag("pause").is_err());
    }
}
