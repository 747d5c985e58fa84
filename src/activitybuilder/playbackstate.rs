use strum::Display;

const BUFFER_ASSET: &str = "https://github.com/Fadexz/mpv-discord-improvedstatus/blob/main/assets/737663962677510245/buffer.png?raw=true";
const LOOP_ASSET: &str = "https://github.com/Fadexz/mpv-discord-improvedstatus/blob/main/assets/737663962677510245/loop.png?raw=true";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackFlags {
    pub buffering: bool,
    pub paused: bool,
    pub looping: bool,
}

/// What the small image shows. Variant names double as the caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PlaybackState {
    Buffering,
    Paused,
    Looping,
    Playing,
}

type Rule = (fn(&PlaybackFlags) -> bool, PlaybackState);

// First match wins
const RULES: [Rule; 3] = [
    (|f| f.buffering, PlaybackState::Buffering),
    (|f| f.paused, PlaybackState::Paused),
    (|f| f.looping, PlaybackState::Looping),
];

impl PlaybackState {
    pub fn from_flags(flags: &PlaybackFlags) -> Self {
        RULES
            .iter()
            .find(|(matches, _)| matches(flags))
            .map(|(_, state)| *state)
            .unwrap_or(PlaybackState::Playing)
    }

    pub fn image_key(self) -> &'static str {
        match self {
            PlaybackState::Buffering => BUFFER_ASSET,
            PlaybackState::Paused => "player_pause",
            PlaybackState::Looping => LOOP_ASSET,
            PlaybackState::Playing => "player_play",
        }
    }
}
