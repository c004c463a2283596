// ABOUTME: Canonical forms for video and channel identifiers across backup formats
// ABOUTME: NewPipe stores full URLs while LibreTube stores bare ids; both normalize here

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static VIDEO_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|shorts/|embed/|live/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .expect("Invalid video URL regex")
});

static VIDEO_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Invalid video id regex"));

static CHANNEL_PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|/)channel/(UC[A-Za-z0-9_-]{22})(?:[/?#]|$)").expect("Invalid channel path regex")
});

static CHANNEL_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^UC[A-Za-z0-9_-]{22}$").expect("Invalid channel id regex"));

/// Normalize a video reference to its canonical string form
///
/// YouTube watch, shorts, embed, live and youtu.be URLs as well as bare ids
/// collapse to the 11-character video id. Anything else (PeerTube,
/// SoundCloud, ...) is canonicalized as a URL.
///
/// # Examples
///
/// ```
/// # use npconv::ids::normalize_video_id;
/// assert_eq!(normalize_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), "dQw4w9WgXcQ");
/// assert_eq!(normalize_video_id("https://youtu.be/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
/// assert_eq!(normalize_video_id(" dQw4w9WgXcQ "), "dQw4w9WgXcQ");
/// ```
pub fn normalize_video_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if VIDEO_ID_REGEX.is_match(trimmed) {
        return trimmed.to_string();
    }
    if let Some(captures) = VIDEO_URL_REGEX.captures(trimmed) {
        if let Some(id) = captures.get(1) {
            return id.as_str().to_string();
        }
    }
    canonical_url(trimmed)
}

/// Normalize a channel reference to its canonical string form
///
/// `https://www.youtube.com/channel/UC...`, `/channel/UC...` and bare
/// `UC...` ids collapse to the channel id.
pub fn normalize_channel_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if CHANNEL_ID_REGEX.is_match(trimmed) {
        return trimmed.to_string();
    }
    if let Some(captures) = CHANNEL_PATH_REGEX.captures(trimmed) {
        if let Some(id) = captures.get(1) {
            return id.as_str().to_string();
        }
    }
    canonical_url(trimmed)
}

/// True if the normalized id is a YouTube channel id
pub fn is_youtube_channel_id(id: &str) -> bool {
    CHANNEL_ID_REGEX.is_match(id)
}

/// True if the normalized id is a YouTube video id
pub fn is_youtube_video_id(id: &str) -> bool {
    VIDEO_ID_REGEX.is_match(id)
}

pub fn youtube_video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

pub fn youtube_channel_url(channel_id: &str) -> String {
    format!("https://www.youtube.com/channel/{}", channel_id)
}

/// Relative channel path, the form LibreTube keeps in `uploaderUrl`
pub fn channel_path(channel_id: &str) -> String {
    format!("/channel/{}", channel_id)
}

/// Canonical form of a URL that is not a recognized YouTube reference
///
/// Forces https, strips `www.` and `m.` host prefixes and a trailing slash.
/// Strings that do not parse as URLs are returned trimmed and unchanged.
fn canonical_url(raw: &str) -> String {
    let parsed = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return raw.to_string(),
    };

    let host = match parsed.host_str() {
        Some(host) => host
            .strip_prefix("www.")
            .or_else(|| host.strip_prefix("m."))
            .unwrap_or(host)
            .to_ascii_lowercase(),
        None => return raw.to_string(),
    };

    let path = parsed.path().trim_end_matches('/');
    let mut canonical = format!("https://{}{}", host, path);
    if let Some(query) = parsed.query() {
        canonical.push('?');
        canonical.push_str(query);
    }
    canonical
}
