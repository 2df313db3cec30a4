//! Classification of the current track URI into a music source.

use std::fmt;

const RADIO_PREFIXES: &[&str] = &[
    "x-rincon-mp3radio:",
    "x-sonosapi-stream:",
    "x-sonosapi-radio:",
    "x-sonosapi-hls:",
    "x-sonos-http:sonos",
    "aac:",
    "hls-radio:",
];

/// What the player is currently playing from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MusicSource {
    None,
    Library,
    Radio,
    WebFile,
    LineIn,
    Tv,
    Airplay,
    SpotifyConnect,
    Unknown,
}

impl MusicSource {
    /// Classifies a `TrackURI` as returned by GetPositionInfo.
    pub fn from_uri(uri: &str) -> Self {
        let uri = uri.trim();

        if uri.is_empty() {
            return MusicSource::None;
        }
        if uri.starts_with("x-file-cifs:") {
            return MusicSource::Library;
        }
        if RADIO_PREFIXES.iter().any(|p| uri.starts_with(p)) {
            return MusicSource::Radio;
        }
        if uri.starts_with("http:") || uri.starts_with("https:") {
            return MusicSource::WebFile;
        }
        if uri.starts_with("x-rincon-stream:") {
            return MusicSource::LineIn;
        }
        if uri.starts_with("x-sonos-htastream:") {
            return MusicSource::Tv;
        }
        if uri.starts_with("x-sonos-vli:") {
            if uri.contains(",airplay:") {
                return MusicSource::Airplay;
            }
            if uri.contains(",spotify:") {
                return MusicSource::SpotifyConnect;
            }
        }

        MusicSource::Unknown
    }

    /// Label shown on the status line.
    pub fn as_str(&self) -> &'static str {
        match self {
            MusicSource::None => "NONE",
            MusicSource::Library => "LIBRARY",
            MusicSource::Radio => "RADIO",
            MusicSource::WebFile => "WEB_FILE",
            MusicSource::LineIn => "LINE_IN",
            MusicSource::Tv => "TV",
            MusicSource::Airplay => "AIRPLAY",
            MusicSource::SpotifyConnect => "SPOTIFY_CONNECT",
            MusicSource::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for MusicSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
