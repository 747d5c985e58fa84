/// Title mpv gives an HLS playlist it is only reading the manifest of
pub const HLS_MANIFEST: &str = "index.m3u8";
/// Streams smaller than this are manifests or segments, not the media itself
pub const MIN_STREAM_SIZE: f64 = 120_000.0;

pub fn video_codec(codec: &str) -> String {
    match codec {
        "prores" => "ProRes".to_string(),
        "dnxhd" => "DNxHD".to_string(),
        "dnxhr" => "DNxHR".to_string(),
        "cfhd" => "CineForm".to_string(),
        "mpeg2video" => "MPEG-2".to_string(),
        other => other.to_uppercase(),
    }
}

pub fn audio_codec(codec: &str) -> String {
    match codec {
        "opus" | "vorbis" => {
            let mut chars = codec.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        "truehd" => "TrueHD".to_string(),
        pcm if pcm.starts_with("pcm_") => "PCM".to_string(),
        other => other.to_uppercase(),
    }
}

/// `None` at normal speed
pub fn speed(speed: f64) -> Option<String> {
    if speed == 1.0 {
        None
    } else {
        Some(format!("(x{})", speed))
    }
}

/// 23.976023 -> "23.976", 25.0 -> "25"
pub fn fps(fps: f64) -> String {
    let fixed = format!("{:.3}", fps);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn video_bitrate(bits: i64) -> String {
    format!("({} mbps)", bits / 1_000_000)
}

pub fn audio_bitrate(bits: i64) -> String {
    format!("({} kbps)", bits / 1000)
}

fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

pub fn file_size(bytes: f64) -> String {
    let kib = bytes / 1024.0;
    let mib = kib / 1024.0;
    let gib = mib / 1024.0;
    if kib < 1000.0 {
        format!("{:.1} MiB", mib)
    } else if mib < 1000.0 {
        format!("{} MiB", round_half_up(mib))
    } else if gib < 10.0 {
        format!("{:.1} GiB", gib)
    } else {
        format!("{} GiB", round_half_up(gib))
    }
}

/// Local files always show their size. Streams only do once they are clearly not an HLS
/// manifest.
pub fn shows_file_size(stream_path: Option<&str>, media_title: Option<&str>, bytes: f64) -> bool {
    match stream_path {
        None => true,
        Some(_) => media_title != Some(HLS_MANIFEST) && bytes >= MIN_STREAM_SIZE,
    }
}

pub fn truncate(s: String, to: usize) -> String {
    match s.char_indices().nth(to) {
        None => s,
        Some((idx, _)) => s[..idx].to_string(),
    }
}
