pub mod formatting;
pub mod playbackstate;
pub mod snapshot;

use std::{error::Error, fmt::Display};

use playbackstate::{PlaybackFlags, PlaybackState};
use snapshot::PlaybackSnapshot;

use crate::discordclient::activity::{Activity, ActivityKind, Assets, Timestamps};
use crate::mpvclient::propertyvalue::TypeMismatch;

const LARGE_IMAGE: &str = "mpv";
const MAX_DETAILS: usize = 128;

#[derive(Debug, Clone, PartialEq)]
enum ErrType {
    Missing(String),
    Mismatch(String, TypeMismatch),
}

// The snapshot could not be turned into an activity. Only ever affects the current cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildError {
    reason: ErrType,
}

impl Error for BuildError {}

impl Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            ErrType::Missing(key) => write!(f, "Required property missing: {}", key),
            ErrType::Mismatch(key, m) => write!(f, "Unexpected type for {}: {}", key, m),
        }
    }
}

impl BuildError {
    pub fn missing(key: &str) -> BuildError {
        Self {
            reason: ErrType::Missing(key.to_string()),
        }
    }

    pub fn mismatch(key: &str, m: TypeMismatch) -> BuildError {
        Self {
            reason: ErrType::Mismatch(key.to_string(), m),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Built {
    pub activity: Activity,
    /// Anchor to pass into the next cycle
    pub anchor: i64,
}

/// Turns one cycle's snapshot into an activity.
///
/// `anchor` is the epoch millisecond the elapsed-time window is measured from. The window is only
/// produced while playback is running, and only then does the anchor move forward to `now`. While
/// paused the anchor stays put, so the window does not drift between cycles.
pub fn build(snapshot: &PlaybackSnapshot, anchor: i64, now: i64) -> Result<Built, BuildError> {
    let large_text = match snapshot.text("mpv-version") {
        Some(version) => version.split('-').next().unwrap_or(version).to_string(),
        None => LARGE_IMAGE.to_string(),
    };

    let media_title = snapshot.text("media-title");
    let mut details = match snapshot.raw_str("metadata/by-key/Title")? {
        Some(title) => title.to_string(),
        None => media_title.unwrap_or_default().to_string(),
    };
    if let Some(artist) = snapshot.raw_str("metadata/by-key/Artist")? {
        details.push_str(" by ");
        details.push_str(artist);
    }
    if let Some(album) = snapshot.raw_str("metadata/by-key/Album")? {
        details.push_str(" on ");
        details.push_str(album);
    }

    let video_codec = snapshot.text("video-format").map(formatting::video_codec);
    let kind = if video_codec.is_some() {
        ActivityKind::Watching
    } else {
        ActivityKind::Listening
    };

    let segments: Vec<String> = [
        snapshot.number("speed").and_then(formatting::speed),
        snapshot.text("height").map(|h| format!("{}p", h)),
        snapshot
            .number("container-fps")
            .map(|fps| format!("{}fps", formatting::fps(fps))),
        video_codec,
        snapshot
            .integer("video-bitrate")
            .map(formatting::video_bitrate),
        snapshot.text("audio-codec-name").map(formatting::audio_codec),
        snapshot
            .integer("audio-bitrate")
            .map(formatting::audio_bitrate),
        snapshot
            .number("file-size")
            .filter(|bytes| {
                formatting::shows_file_size(snapshot.text("stream-path"), media_title, *bytes)
            })
            .map(formatting::file_size),
    ]
    .into_iter()
    .flatten()
    .collect();
    let state = if segments.is_empty() {
        None
    } else {
        Some(segments.join(" "))
    };

    let paused = snapshot.flag("pause")?;
    let flags = PlaybackFlags {
        buffering: snapshot.flag("paused-for-cache")?.unwrap_or(false),
        paused: paused.unwrap_or(false),
        looping: snapshot.text("loop-file").is_some_and(|l| l != "no"),
    };
    let playback = PlaybackState::from_flags(&flags);
    let mut small_text = playback.to_string();
    if let Some(percent) = snapshot.raw_number("percent-pos")? {
        small_text.push_str(&format!(" ({}%)", percent as i64));
    }
    if let Some(count) = snapshot.raw_number("playlist-count")? {
        if count as i64 > 1 {
            if let Some(pos) = snapshot.raw_number("playlist-pos-1")? {
                small_text.push_str(&format!(" [{}/{}]", pos as i64, count as i64));
            }
        }
    }

    let duration = snapshot
        .raw_number("duration")?
        .ok_or_else(|| BuildError::missing("duration"))?;
    let position = snapshot
        .raw_number("time-pos")?
        .ok_or_else(|| BuildError::missing("time-pos"))?;
    // `as` saturates, the arithmetic has to as well
    let start = anchor.saturating_sub((position as i64).saturating_mul(1000));
    let end = start.saturating_add((duration as i64).max(0).saturating_mul(1000));
    let (timestamps, anchor) = match paused {
        Some(false) => (Some(Timestamps { start, end }), now),
        _ => (None, anchor),
    };

    Ok(Built {
        activity: Activity {
            kind,
            details: formatting::truncate(details, MAX_DETAILS),
            state,
            assets: Assets {
                large_image: LARGE_IMAGE.to_string(),
                large_text,
                small_image: playback.image_key().to_string(),
                small_text,
            },
            timestamps,
        },
        anchor,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mpvclient::propertyvalue::PropertyValue;

    const T: i64 = 1_700_000_000_000;
    const NOW: i64 = T + 5_000;

    fn playing() -> PlaybackSnapshot {
        PlaybackSnapshot::default()
            .with("pause", false)
            .with("time-pos", 30.0)
            .with("duration", 120.0)
    }

    fn full() -> PlaybackSnapshot {
        playing()
            .with("mpv-version", "mpv 0.37.0-dirty")
            .with("media-title", "bbb_1080p.mkv")
            .with("metadata/by-key/Title", "Big Buck Bunny")
            .with("metadata/by-key/Artist", "Blender")
            .with("metadata/by-key/Album", "Open Movies")
            .with("speed", "1.250000")
            .with("height", "1080")
            .with("container-fps", "23.976024")
            .with("video-format", "h264")
            .with("video-bitrate", "8500000")
            .with("audio-codec-name", "opus")
            .with("audio-bitrate", "128900")
            .with("file-size", "734003200")
            .with("loop-file", "no")
            .with("paused-for-cache", false)
            .with("percent-pos", 25.7)
            .with("playlist-count", 3.0)
            .with("playlist-pos-1", 2.0)
    }

    #[test]
    fn test_full_snapshot() {
        let built = build(&full(), T, NOW).unwrap();
        let activity = built.activity;
        assert_eq!(activity.kind, ActivityKind::Watching);
        assert_eq!(activity.details, "Big Buck Bunny by Blender on Open Movies");
        assert_eq!(
            activity.state.as_deref(),
            Some("(x1.25) 1080p 23.976fps H264 (8 mbps) Opus (128 kbps) 700 MiB")
        );
        assert_eq!(activity.assets.large_image, "mpv");
        assert_eq!(activity.assets.large_text, "mpv 0.37.0");
        assert_eq!(activity.assets.small_image, "player_play");
        assert_eq!(activity.assets.small_text, "Playing (25%) [2/3]");
    }

    #[test]
    fn test_minimal_snapshot() {
        let built = build(&playing(), T, NOW).unwrap();
        let activity = built.activity;
        assert_eq!(activity.kind, ActivityKind::Listening);
        assert_eq!(activity.details, "");
        assert_eq!(activity.state, None);
        assert_eq!(activity.assets.large_text, "mpv");
        assert_eq!(activity.assets.small_text, "Playing");
    }

    #[test]
    fn test_optional_segments_are_dropped() {
        // Every optional property, removed one at a time
        let optional = [
            ("speed", "(x1.25)"),
            ("height", "1080p"),
            ("container-fps", "23.976fps"),
            ("video-bitrate", "(8 mbps)"),
            ("audio-codec-name", "Opus"),
            ("audio-bitrate", "(128 kbps)"),
            ("file-size", "700 MiB"),
        ];
        for (key, segment) in optional {
            let mut snapshot = full();
            snapshot.set(key, PropertyValue::Null);
            let state = build(&snapshot, T, NOW).unwrap().activity.state.unwrap();
            assert!(!state.contains(segment), "{} still in {:?}", segment, state);
            assert!(!state.contains("  "), "empty segment in {:?}", state);
            assert_eq!(state.split(' ').count(), 11 - segment.split(' ').count());
        }
    }

    #[test]
    fn test_metadata_fallback() {
        let snapshot = playing()
            .with("media-title", "track01.flac")
            .with("metadata/by-key/Album", "Discovery");
        let activity = build(&snapshot, T, NOW).unwrap().activity;
        assert_eq!(activity.details, "track01.flac on Discovery");
    }

    #[test]
    fn test_details_truncated() {
        let snapshot = playing().with("media-title", "a".repeat(300).as_str());
        let activity = build(&snapshot, T, NOW).unwrap().activity;
        assert_eq!(activity.details.chars().count(), 128);
    }

    #[test]
    fn test_normal_speed_hidden() {
        let snapshot = playing().with("speed", "1.000000");
        assert_eq!(build(&snapshot, T, NOW).unwrap().activity.state, None);
    }

    #[test]
    fn test_audio_only() {
        let snapshot = playing()
            .with("audio-codec-name", "pcm_s16le")
            .with("audio-bitrate", "1411200");
        let activity = build(&snapshot, T, NOW).unwrap().activity;
        assert_eq!(activity.kind, ActivityKind::Listening);
        assert_eq!(activity.state.as_deref(), Some("PCM (1411 kbps)"));
    }

    #[test]
    fn test_hls_manifest_size_hidden() {
        let snapshot = playing()
            .with("media-title", "index.m3u8")
            .with("stream-path", "https://example.com/live/index.m3u8")
            .with("file-size", "50000");
        assert_eq!(build(&snapshot, T, NOW).unwrap().activity.state, None);
    }

    #[test]
    fn test_local_file_size_shown() {
        let snapshot = playing()
            .with("media-title", "index.m3u8")
            .with("file-size", "50000");
        assert_eq!(
            build(&snapshot, T, NOW).unwrap().activity.state.as_deref(),
            Some("0.0 MiB")
        );
    }

    #[test]
    fn test_states() {
        let buffering = full().with("paused-for-cache", true).with("pause", true);
        let activity = build(&buffering, T, NOW).unwrap().activity;
        assert_eq!(activity.assets.small_text, "Buffering (25%) [2/3]");

        let paused = full().with("pause", true).with("loop-file", "inf");
        let activity = build(&paused, T, NOW).unwrap().activity;
        assert_eq!(activity.assets.small_image, "player_pause");
        assert_eq!(activity.assets.small_text, "Paused (25%) [2/3]");

        let looping = full().with("loop-file", "inf").with("playlist-count", 1.0);
        let activity = build(&looping, T, NOW).unwrap().activity;
        assert!(activity.assets.small_image.contains("loop.png"));
        assert_eq!(activity.assets.small_text, "Looping (25%)");
    }

    #[test]
    fn test_missing_position() {
        let mut snapshot = full();
        snapshot.set("time-pos", PropertyValue::Null);
        let err = build(&snapshot, T, NOW).unwrap_err();
        assert_eq!(err, BuildError::missing("time-pos"));

        let mut snapshot = full();
        snapshot.set("duration", PropertyValue::Null);
        let err = build(&snapshot, T, NOW).unwrap_err();
        assert_eq!(err.to_string(), "Required property missing: duration");
    }

    #[test]
    fn test_type_mismatch() {
        let snapshot = full().with("time-pos", "thirty");
        let err = build(&snapshot, T, NOW).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected type for time-pos: expected number, found string"
        );
        let snapshot = full().with("pause", 0.0);
        assert!(build(&snapshot, T, NOW).is_err());
    }

    #[test]
    fn test_window_while_playing() {
        let built = build(&playing(), T, NOW).unwrap();
        assert_eq!(
            built.activity.timestamps,
            Some(Timestamps {
                start: T - 30_000,
                end: T - 30_000 + 120_000,
            })
        );
        assert_eq!(built.anchor, NOW);
    }

    #[test]
    fn test_no_window_while_paused() {
        let snapshot = playing().with("pause", true);
        let mut anchor = T;
        for cycle in 1..=3 {
            let built = build(&snapshot, anchor, NOW + cycle * 5_000).unwrap();
            assert_eq!(built.activity.timestamps, None);
            assert_eq!(built.anchor, T);
            anchor = built.anchor;
        }
    }

    #[test]
    fn test_no_window_when_pause_unknown() {
        let mut snapshot = playing();
        snapshot.set("pause", PropertyValue::Null);
        let built = build(&snapshot, T, NOW).unwrap();
        assert_eq!(built.activity.timestamps, None);
        assert_eq!(built.anchor, T);
    }

    #[test]
    fn test_fractional_position() {
        let snapshot = playing().with("time-pos", 30.9).with("duration", 120.4);
        let window = build(&snapshot, T, NOW).unwrap().activity.timestamps.unwrap();
        assert_eq!(window.start, T - 30_000);
        assert_eq!(window.end - window.start, 120_000);
    }

    #[test]
    fn test_huge_position() {
        let snapshot = playing().with("time-pos", 1e17).with("duration", 1e300);
        let window = build(&snapshot, T, NOW).unwrap().activity.timestamps.unwrap();
        assert_eq!(window.start, T - i64::MAX);
        assert_eq!(window.end, T);
    }
}
